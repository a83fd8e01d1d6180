use opencl3::{
    command_queue::CommandQueue,
    context::Context,
    event::Event,
    memory::{
        Buffer, ClMem, CL_MAP_READ, CL_MAP_WRITE_INVALIDATE_REGION, CL_MEM_ALLOC_HOST_PTR,
        CL_MEM_READ_WRITE,
    },
    types::{cl_map_flags, cl_mem, cl_uint, CL_BLOCKING},
};
use std::{
    ffi::c_void,
    marker::PhantomData,
    mem::{size_of, ManuallyDrop},
    ops::{Deref, DerefMut},
    ptr, slice,
};
use tracing::debug;

#[cfg(feature = "metrics")]
use crate::metrics::{record, ALLOCS, ALLOC_BYTES};
#[cfg(feature = "metrics")]
use std::{sync::atomic::Ordering, time::Instant};

use crate::ClError;

/// Element count of every sample buffer (1 Mi `cl_uint`s).
pub const ELEMENTS: usize = 1024 * 1024;

/// Byte size of a buffer holding `ELEMENTS` values.
pub const BYTES: usize = ELEMENTS * size_of::<cl_uint>();

// ─── Typ‑State‑Marker ────────────────────────────────────────────────
mod sealed {
    pub trait Sealed {}
}

pub trait State: sealed::Sealed {}

/// Allocated, contents undefined.
pub struct Queued;
impl sealed::Sealed for Queued {}
impl State for Queued {}

/// A device command writing this buffer has been enqueued.
pub struct InFlight;
impl sealed::Sealed for InFlight {}
impl State for InFlight {}

/// Contents are synchronized and may be read or used as a source.
pub struct Ready;
impl sealed::Sealed for Ready {}
impl State for Ready {}

// ─── GPU‑Buffer Wrapper ──────────────────────────────────────────────

/// Device buffer allocated with `CL_MEM_ALLOC_HOST_PTR` so it can be mapped.
pub struct GpuBuffer<S> {
    buf: Buffer<u8>,
    len: usize,
    _state: PhantomData<S>,
}

impl<S> std::fmt::Debug for GpuBuffer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuBuffer")
            .field("len", &self.len)
            .field("state", &std::any::type_name::<S>())
            .finish()
    }
}

impl<S> Drop for GpuBuffer<S> {
    #[inline]
    fn drop(&mut self) {
        #[cfg(feature = "metrics")]
        {
            ALLOCS.fetch_sub(1, Ordering::Relaxed);
            ALLOC_BYTES.fetch_sub(self.len, Ordering::Relaxed);
        }
    }
}

impl<S> GpuBuffer<S> {
    /// Moves the handle into another state without running `Drop`.
    fn into_state<T>(self) -> GpuBuffer<T> {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so `buf` is moved out exactly once.
        let buf = unsafe { ptr::read(&this.buf) };
        GpuBuffer {
            buf,
            len: this.len,
            _state: PhantomData,
        }
    }

    #[inline(always)]
    pub fn raw(&self) -> &Buffer<u8> {
        &self.buf
    }

    /// Length in bytes.
    #[inline(always)]
    pub fn byte_len(&self) -> usize {
        self.len
    }

    /// Number of `cl_uint` elements the buffer holds.
    #[inline(always)]
    pub fn elements(&self) -> usize {
        self.len / size_of::<cl_uint>()
    }
}

// ── Queued ───────────────────────────────────────────────────────────
impl GpuBuffer<Queued> {
    /// Allocates `len` bytes of host-mappable device memory.
    pub fn new(ctx: &Context, len: usize) -> Result<Self, ClError> {
        if len == 0 {
            return Err(ClError::InvalidSize(len));
        }

        #[cfg(feature = "metrics")]
        let t = Instant::now();

        // SAFETY: no host pointer is supplied, the runtime owns the allocation.
        let buf = unsafe {
            Buffer::<u8>::create(
                ctx,
                CL_MEM_READ_WRITE | CL_MEM_ALLOC_HOST_PTR,
                len,
                ptr::null_mut(),
            )?
        };

        #[cfg(feature = "metrics")]
        {
            record("GpuBuffer::new", t);
            ALLOCS.fetch_add(1, Ordering::Relaxed);
            ALLOC_BYTES.fetch_add(len, Ordering::Relaxed);
        }

        debug!(bytes = len, "allocated device buffer");
        Ok(Self {
            buf,
            len,
            _state: PhantomData,
        })
    }

    /// Allocates a buffer of `count` `cl_uint` elements.
    pub fn with_elements(ctx: &Context, count: usize) -> Result<Self, ClError> {
        Self::new(ctx, count * size_of::<cl_uint>())
    }

    /// Maps the buffer with `CL_MAP_WRITE_INVALIDATE_REGION`, stores `f(i)`
    /// at every index and unmaps again.
    pub fn fill_with<F>(mut self, queue: &CommandQueue, f: F) -> Result<GpuBuffer<Ready>, ClError>
    where
        F: Fn(usize) -> cl_uint,
    {
        let mut view: MappedSlice<'_, Write> = map(
            &mut self.buf,
            self.len,
            queue,
            CL_MAP_WRITE_INVALIDATE_REGION,
        )?;
        for (i, slot) in view.iter_mut().enumerate() {
            *slot = f(i);
        }
        view.unmap()?;

        debug!(elements = self.elements(), "filled source buffer");
        Ok(self.into_state())
    }

    /// Enqueues a device-side copy of `src` into this buffer.
    pub fn copy_from(
        mut self,
        queue: &CommandQueue,
        src: &GpuBuffer<Ready>,
    ) -> Result<(GpuBuffer<InFlight>, GpuEventGuard), ClError> {
        if src.len != self.len {
            return Err(ClError::SizeMismatch {
                expected: self.len,
                actual: src.len,
            });
        }

        #[cfg(feature = "metrics")]
        let t = Instant::now();

        // SAFETY: both buffers are unmapped and exactly `len` bytes long.
        let evt = unsafe {
            queue.enqueue_copy_buffer(&src.buf, &mut self.buf, 0, 0, self.len, &[])?
        };

        #[cfg(feature = "metrics")]
        record("enqueue_copy", t);

        debug!(bytes = self.len, "enqueued buffer copy");
        Ok((self.into_state(), GpuEventGuard { evt }))
    }

    /// Marks the buffer as the target of a command about to be enqueued.
    #[inline(always)]
    pub fn launch(self) -> GpuBuffer<InFlight> {
        self.into_state()
    }
}

// ── InFlight ─────────────────────────────────────────────────────────
impl GpuBuffer<InFlight> {
    /// Waits for the producing command and transitions to `Ready`.
    pub fn into_ready(self, guard: GpuEventGuard) -> Result<GpuBuffer<Ready>, ClError> {
        #[cfg(feature = "metrics")]
        let t = Instant::now();

        guard.wait()?;

        #[cfg(feature = "metrics")]
        record("into_ready", t);

        Ok(self.into_state())
    }
}

// ── Ready → Host ─────────────────────────────────────────────────────
impl GpuBuffer<Ready> {
    /// Blocking `CL_MAP_READ` mapping of the whole buffer.
    pub fn map_read<'a>(
        &'a mut self,
        queue: &'a CommandQueue,
    ) -> Result<MappedSlice<'a, Read>, ClError> {
        map(&mut self.buf, self.len, queue, CL_MAP_READ)
    }
}

// ─── Mapping ─────────────────────────────────────────────────────────

/// Access mode of a [`MappedSlice`].
pub trait MapMode: sealed::Sealed {}

pub struct Read;
impl sealed::Sealed for Read {}
impl MapMode for Read {}

pub struct Write;
impl sealed::Sealed for Write {}
impl MapMode for Write {}

/// Host view over a mapped buffer. Unmaps when dropped.
///
/// The view holds the buffer's `&mut` borrow, so the buffer cannot take part
/// in a copy or kernel launch until it is unmapped.
pub struct MappedSlice<'a, M: MapMode> {
    queue: &'a CommandQueue,
    buf: &'a mut Buffer<u8>,
    host_ptr: *mut c_void,
    len: usize,
    _mode: PhantomData<M>,
}

fn map<'a, M: MapMode>(
    buf: &'a mut Buffer<u8>,
    len: usize,
    queue: &'a CommandQueue,
    flags: cl_map_flags,
) -> Result<MappedSlice<'a, M>, ClError> {
    #[cfg(feature = "metrics")]
    let t = Instant::now();

    let mut host_ptr: cl_mem = ptr::null_mut();
    // SAFETY: blocking map of the full buffer; the pointer lives until unmap.
    let evt = unsafe {
        queue.enqueue_map_buffer(buf, CL_BLOCKING, flags, 0, len, &mut host_ptr, &[])?
    };
    evt.wait()?;

    #[cfg(feature = "metrics")]
    record("enqueue_map", t);

    let mapped = MappedSlice {
        queue,
        buf,
        host_ptr: host_ptr as *mut c_void,
        len,
        _mode: PhantomData,
    };
    // Dropping `mapped` on the error path unmaps it.
    bytemuck::try_cast_slice::<u8, cl_uint>(mapped.bytes()).map_err(ClError::Misaligned)?;

    debug!(bytes = len, flags, "mapped buffer");
    Ok(mapped)
}

impl<M: MapMode> MappedSlice<'_, M> {
    fn bytes(&self) -> &[u8] {
        // SAFETY: the runtime mapped `len` bytes at `host_ptr`, valid until unmap.
        unsafe { slice::from_raw_parts(self.host_ptr as *const u8, self.len) }
    }

    fn release(&mut self) -> Result<(), ClError> {
        let host_ptr = std::mem::replace(&mut self.host_ptr, ptr::null_mut());
        if host_ptr.is_null() {
            return Ok(());
        }

        #[cfg(feature = "metrics")]
        let t = Instant::now();

        // SAFETY: `host_ptr` came from mapping `buf` on this queue.
        let evt = unsafe { self.queue.enqueue_unmap_mem_object(self.buf.get(), host_ptr, &[])? };
        evt.wait()?;

        #[cfg(feature = "metrics")]
        record("enqueue_unmap", t);

        debug!(bytes = self.len, "unmapped buffer");
        Ok(())
    }

    /// Unmaps explicitly, reporting a failed unmap instead of ignoring it.
    pub fn unmap(mut self) -> Result<(), ClError> {
        self.release()
    }
}

impl<M: MapMode> Deref for MappedSlice<'_, M> {
    type Target = [cl_uint];

    fn deref(&self) -> &[cl_uint] {
        if self.host_ptr.is_null() {
            return &[];
        }
        bytemuck::cast_slice(self.bytes())
    }
}

impl DerefMut for MappedSlice<'_, Write> {
    fn deref_mut(&mut self) -> &mut [cl_uint] {
        if self.host_ptr.is_null() {
            return &mut [];
        }
        // SAFETY: as in `bytes`, and write access was requested at map time.
        let bytes = unsafe { slice::from_raw_parts_mut(self.host_ptr as *mut u8, self.len) };
        bytemuck::cast_slice_mut(bytes)
    }
}

impl<M: MapMode> Drop for MappedSlice<'_, M> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(error = %e, "unmap on drop failed");
        }
    }
}

// ── Guard (wartet bei Drop auf Event) ────────────────────────────────
pub struct GpuEventGuard {
    evt: Event,
}

impl std::fmt::Debug for GpuEventGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuEventGuard").finish_non_exhaustive()
    }
}

impl Drop for GpuEventGuard {
    #[inline]
    fn drop(&mut self) {
        let _ = self.evt.wait();
    }
}

impl GpuEventGuard {
    pub fn new(evt: Event) -> Self {
        Self { evt }
    }

    /// Explicit wait that reports the event's error.
    pub fn wait(self) -> Result<(), ClError> {
        let this = ManuallyDrop::new(self);
        let result = this.evt.wait().map_err(ClError::from);
        // SAFETY: `this` is never dropped, the event is released exactly once here.
        drop(unsafe { ptr::read(&this.evt) });
        result
    }
}
