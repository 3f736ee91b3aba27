use cubescene_render::RenderError;

/// Run `create` inside a validation error scope.
///
/// wgpu reports validation failures asynchronously and, outside a scope,
/// hands them to the uncaptured-error handler, which panics by default.
pub(crate) fn validated<T>(
    device: &wgpu::Device,
    create: impl FnOnce() -> T,
    on_error: impl FnOnce(wgpu::Error) -> RenderError,
) -> Result<T, RenderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(on_error(err)),
        None => Ok(value),
    }
}
