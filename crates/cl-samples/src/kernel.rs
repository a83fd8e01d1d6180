use opencl3::{
    error_codes::CL_BUILD_PROGRAM_FAILURE,
    kernel::{ExecuteKernel, Kernel},
    program::Program,
};
use tracing::{debug, info, warn};

#[cfg(feature = "metrics")]
use crate::metrics::record;
#[cfg(feature = "metrics")]
use std::time::Instant;

use crate::{
    buffer::{GpuBuffer, GpuEventGuard, ELEMENTS},
    cli::Args,
    copy::verify_destination,
    select::{Selection, Session},
    verify::identity,
    ClError,
};

/// One work-item per element: `dst[id] = src[id]`.
pub const COPY_BUFFER_SOURCE: &str = r#"
kernel void CopyBuffer( global uint* dst, global uint* src )
{
    uint id = get_global_id(0);
    dst[id] = src[id];
}
"#;

pub const KERNEL_NAME: &str = "CopyBuffer";

/// Compiler output for one device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceLog {
    pub device: String,
    pub log: String,
}

/// Result of building a program: either usable, or rejected by the compiler.
pub enum BuildOutcome {
    Built(Program),
    Failed(Vec<DeviceLog>),
}

/// Terminal state of a `copybufferkernel` run that did not error out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelRun {
    Verified,
    BuildFailed,
}

/// Builds `source` for the session's device. A compiler rejection is
/// returned as `BuildOutcome::Failed`; every other error propagates.
pub fn build_program(session: &Session, source: &str) -> Result<BuildOutcome, ClError> {
    let mut program = Program::create_from_source(&session.context, source)?;
    let device_id = session.device.id();

    match program.build(&[device_id], "") {
        Ok(()) => {
            debug!("program built");
            Ok(BuildOutcome::Built(program))
        }
        Err(e) if e.0 == CL_BUILD_PROGRAM_FAILURE => {
            warn!("program build failed");
            let logs = vec![DeviceLog {
                device: session.device.name()?,
                log: program.get_build_log(device_id)?,
            }];
            Ok(BuildOutcome::Failed(logs))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn build_copy_program(session: &Session) -> Result<BuildOutcome, ClError> {
    build_program(session, COPY_BUFFER_SOURCE)
}

/// Prints the per-device build logs of a rejected program.
pub fn report_build_failure(logs: &[DeviceLog]) {
    println!("Compilation of program failed:");
    for entry in logs {
        println!(" - {}:", entry.device);
        println!("{}", entry.log);
    }
    println!("Expected Failure on MacOS...");
}

/// Copies `0..ELEMENTS` from a source to a destination buffer through the
/// `CopyBuffer` kernel and verifies the result.
///
/// A program the compiler rejects is reported and yields
/// `Ok(KernelRun::BuildFailed)`: some drivers cannot build this kernel.
pub fn run_copy_kernel(args: &Args) -> Result<KernelRun, ClError> {
    run_copy_kernel_with(args, COPY_BUFFER_SOURCE)
}

/// `run_copy_kernel` with the program built from `source`, which must define
/// `CopyBuffer(dst, src)` to get past the build step.
pub(crate) fn run_copy_kernel_with(args: &Args, source: &str) -> Result<KernelRun, ClError> {
    let selection = Selection::resolve(args.platform, args.device)?;
    selection.announce()?;
    let session = selection.open()?;

    let program = match build_program(&session, source)? {
        BuildOutcome::Built(program) => program,
        BuildOutcome::Failed(logs) => {
            report_build_failure(&logs);
            return Ok(KernelRun::BuildFailed);
        }
    };
    let kernel = Kernel::create(&program, KERNEL_NAME)?;

    let src = GpuBuffer::with_elements(&session.context, ELEMENTS)?;
    let dst = GpuBuffer::with_elements(&session.context, ELEMENTS)?;

    let src = src.fill_with(&session.queue, identity)?;
    let dst = dst.launch();

    #[cfg(feature = "metrics")]
    let t = Instant::now();

    // SAFETY: argument order and types match `CopyBuffer(dst, src)`, both
    // buffers hold ELEMENTS values and neither is mapped.
    let evt = unsafe {
        ExecuteKernel::new(&kernel)
            .set_arg(dst.raw())
            .set_arg(src.raw())
            .set_global_work_size(ELEMENTS)
            .enqueue_nd_range(&session.queue)?
    };

    #[cfg(feature = "metrics")]
    record("enqueue_kernel", t);

    let mut dst = dst.into_ready(GpuEventGuard::new(evt))?;
    info!(work_items = ELEMENTS, "kernel copy complete");

    verify_destination(&session, &mut dst)?;

    println!("Success.");
    Ok(KernelRun::Verified)
}
