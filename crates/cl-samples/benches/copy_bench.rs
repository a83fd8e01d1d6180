use criterion::{Criterion, criterion_group, criterion_main};
use cl_samples::{
    kernel::{build_copy_program, KERNEL_NAME},
    select, verify::identity, BuildOutcome, GpuBuffer, GpuEventGuard, Selection, ELEMENTS,
};
use opencl3::kernel::{ExecuteKernel, Kernel};

fn bench_copy(c: &mut Criterion) {
    let has_device = select::platforms()
        .unwrap()
        .first()
        .is_some_and(|p| !select::devices(p).unwrap().is_empty());
    if !has_device {
        eprintln!("no OpenCL device found, skipping");
        return;
    }

    let session = Selection::resolve(0, 0).unwrap().open().unwrap();
    let src = GpuBuffer::with_elements(&session.context, ELEMENTS)
        .unwrap()
        .fill_with(&session.queue, identity)
        .unwrap();

    c.bench_function("copy_buffer_4MiB", |b| {
        b.iter(|| {
            let (dst, guard) = GpuBuffer::with_elements(&session.context, ELEMENTS)
                .unwrap()
                .copy_from(&session.queue, &src)
                .unwrap();
            dst.into_ready(guard).unwrap()
        });
    });

    let BuildOutcome::Built(program) = build_copy_program(&session).unwrap() else {
        eprintln!("CopyBuffer kernel does not build on this device, skipping");
        return;
    };
    let kernel = Kernel::create(&program, KERNEL_NAME).unwrap();

    c.bench_function("copy_kernel_4MiB", |b| {
        b.iter(|| {
            let dst = GpuBuffer::with_elements(&session.context, ELEMENTS).unwrap().launch();
            let evt = unsafe {
                ExecuteKernel::new(&kernel)
                    .set_arg(dst.raw())
                    .set_arg(src.raw())
                    .set_global_work_size(ELEMENTS)
                    .enqueue_nd_range(&session.queue)
                    .unwrap()
            };
            dst.into_ready(GpuEventGuard::new(evt)).unwrap()
        });
    });
}

criterion_group!(benches, bench_copy);
criterion_main!(benches);
