use tracing::info;

use crate::{
    buffer::{GpuBuffer, ELEMENTS},
    cli::Args,
    select::{Selection, Session},
    verify::{check_identity, identity},
    ClError,
};

/// Maps `dst`, checks it holds the identity sequence and unmaps it again,
/// whatever the outcome of the check.
pub(crate) fn verify_destination(
    session: &Session,
    dst: &mut GpuBuffer<crate::Ready>,
) -> Result<(), ClError> {
    let view = dst.map_read(&session.queue)?;
    let verdict = check_identity(&view);
    view.unmap()?;
    verdict
}

/// Fills a source buffer with `0..ELEMENTS`, copies it with
/// `clEnqueueCopyBuffer` and verifies the destination.
pub fn run_copy(args: &Args) -> Result<(), ClError> {
    let selection = Selection::resolve(args.platform, args.device)?;
    selection.announce()?;
    let session = selection.open()?;

    let src = GpuBuffer::with_elements(&session.context, ELEMENTS)?;
    let dst = GpuBuffer::with_elements(&session.context, ELEMENTS)?;

    let src = src.fill_with(&session.queue, identity)?;

    let (dst, guard) = dst.copy_from(&session.queue, &src)?;
    let mut dst = dst.into_ready(guard)?;
    info!(elements = ELEMENTS, "buffer copy complete");

    verify_destination(&session, &mut dst)?;

    println!("Success.");
    Ok(())
}
