use anyhow::{Context, Result};

/// Copies a 4-byte-per-texel color texture into CPU memory.
///
/// Rows are padded to `COPY_BYTES_PER_ROW_ALIGNMENT` on the GPU side; the
/// padding is stripped so the result holds exactly `width * height` texels.
/// Blocks until the copy completes.
pub fn read_texture_rgba8(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    width: u32,
    height: u32,
) -> Result<Vec<[u8; 4]>> {
    anyhow::ensure!(
        texture.format().block_copy_size(None) == Some(4),
        "readback expects a 4-byte texel format, got {:?}",
        texture.format()
    );
    anyhow::ensure!(width > 0 && height > 0, "readback of an empty texture");

    let unpadded_row = width * 4;
    let padded_row = padded_bytes_per_row(unpadded_row);

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("nabu readback staging"),
        size: u64::from(padded_row) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("nabu readback encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let (tx, rx) = std::sync::mpsc::channel();
    staging
        .slice(..)
        .map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
    device
        .poll(wgpu::PollType::wait_indefinitely())
        .context("device poll failed during readback")?;
    rx.recv()
        .context("readback map callback was dropped")?
        .context("failed to map readback buffer")?;

    let mut pixels = Vec::with_capacity((width * height) as usize);
    {
        let data = staging.slice(..).get_mapped_range();
        for row in data.chunks_exact(padded_row as usize) {
            let texels: &[[u8; 4]] = bytemuck::cast_slice(&row[..unpadded_row as usize]);
            pixels.extend_from_slice(texels);
        }
    }
    staging.unmap();

    Ok(pixels)
}

fn padded_bytes_per_row(unpadded: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}
