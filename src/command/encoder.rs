use super::{
    BarrierMode, ClearColorValue, ClearMask, CommandBuffer, InvalidateFlags, ListUsage, Opcode,
};
use crate::descriptor::ResHandle;
use crate::errors::DriverError;
use crate::image::ImageView;
use crate::limits::{
    GpuAddr, IMAGE_DESCRIPTOR_ALIGNMENT, MAX_RENDER_TARGETS, MAX_VERTEX_ATTRIBS,
    MAX_VERTEX_BUFFERS, NUM_IMAGE_BINDINGS, NUM_SCISSORS, NUM_STORAGE_BUFS, NUM_TEXTURE_BINDINGS,
    NUM_UNIFORM_BUFS, NUM_VIEWPORTS, SAMPLER_DESCRIPTOR_ALIGNMENT, UNIFORM_BUF_ALIGNMENT,
    UNIFORM_BUF_MAX_SIZE,
};
use crate::shader::{Shader, Stage, StageFlags};
use crate::state::{
    BlitFlags, BlitRect, BufExtents, CopyBufLayout, DepthStencilState, Face, IdxFormat, Primitive,
    RasterizerState, Scissor, TiledCacheOp, Viewport, VtxAttribState, VtxBufferState,
};
use crate::swapchain::SwapchainState;
use crate::sync::Fence;

use ::std::sync::Arc;

fn push_addr(payload: &mut Vec<u32>, addr: GpuAddr) {
    payload.push(addr as u32);
    payload.push((addr >> 32) as u32);
}

fn push_rect(payload: &mut Vec<u32>, rect: &BlitRect) {
    payload.extend_from_slice(&[
        rect.x,
        rect.y,
        rect.z,
        rect.width,
        rect.height,
        rect.depth,
    ]);
}

impl CommandBuffer {
    // ------------------------------------------------------------------
    // Synchronization
    // ------------------------------------------------------------------

    /// Encode a GPU-side ordering point with an associated set of cache
    /// invalidations.
    pub fn barrier(&mut self, mode: BarrierMode, invalidate: InvalidateFlags) {
        self.emit(Opcode::Barrier, &[mode as u32, invalidate.bits()]);
    }

    /// Encode a wait: execution of the list stalls at this point until the
    /// fence signals. Nothing happens at record time.
    pub fn wait_fence(&mut self, fence: &Fence) {
        let index = self.fence_index(fence);
        self.emit(Opcode::WaitFence, &[index]);
    }

    /// Encode a signal: the fence is re-armed now and signals when the GPU
    /// executes this point in the list. `flush` requests immediate
    /// hardware notification over batched delivery.
    pub fn signal_fence(&mut self, fence: &Fence, flush: bool) {
        fence.arm();
        let index = self.fence_index(fence);
        self.emit(Opcode::SignalFence, &[index, flush as u32]);
    }

    // ------------------------------------------------------------------
    // Resource binding
    // ------------------------------------------------------------------

    /// Bind shaders for the stages selected by `stage_mask`.
    pub fn bind_shaders(&mut self, stage_mask: StageFlags, shaders: &[&Shader]) {
        let mut payload = Vec::with_capacity(2 + shaders.len() * 3);
        payload.push(stage_mask.bits());
        payload.push(shaders.len() as u32);
        for shader in shaders {
            let addr = shader.gpu_addr();
            payload.push(addr as u32);
            payload.push((addr >> 32) as u32);
            payload.push(shader.stage() as u32 | shader.program_id() << 8);
        }
        self.emit(Opcode::BindShaders, &payload);
    }

    /// Bind a single shader at its own stage.
    pub fn bind_shader(&mut self, shader: &Shader) {
        self.bind_shaders(shader.stage().flag(), &[shader]);
    }

    /// Bind uniform buffer ranges starting at slot `first_id`.
    pub fn bind_uniform_buffers(&mut self, stage: Stage, first_id: u32, buffers: &[BufExtents]) {
        if first_id + buffers.len() as u32 > NUM_UNIFORM_BUFS {
            self.raise("bind_uniform_buffers: slot out of range", DriverError::BadInput);
            return;
        }
        for buffer in buffers {
            if buffer.addr % u64::from(UNIFORM_BUF_ALIGNMENT) != 0 {
                self.raise(
                    "bind_uniform_buffers: misaligned buffer address",
                    DriverError::MisalignedData,
                );
                return;
            }
            if buffer.size > UNIFORM_BUF_MAX_SIZE {
                self.raise("bind_uniform_buffers: buffer too large", DriverError::BadInput);
                return;
            }
        }
        self.emit_buffer_table(Opcode::BindUniformBuffers, stage, first_id, buffers);
    }

    /// Bind storage buffer ranges starting at slot `first_id`.
    pub fn bind_storage_buffers(&mut self, stage: Stage, first_id: u32, buffers: &[BufExtents]) {
        if first_id + buffers.len() as u32 > NUM_STORAGE_BUFS {
            self.raise("bind_storage_buffers: slot out of range", DriverError::BadInput);
            return;
        }
        self.emit_buffer_table(Opcode::BindStorageBuffers, stage, first_id, buffers);
    }

    fn emit_buffer_table(
        &mut self,
        op: Opcode,
        stage: Stage,
        first_id: u32,
        buffers: &[BufExtents],
    ) {
        let mut payload = Vec::with_capacity(3 + buffers.len() * 3);
        payload.push(stage as u32);
        payload.push(first_id);
        payload.push(buffers.len() as u32);
        for buffer in buffers {
            push_addr(&mut payload, buffer.addr);
            payload.push(buffer.size);
        }
        self.emit(op, &payload);
    }

    /// Bind texture handles starting at slot `first_id`.
    pub fn bind_textures(&mut self, stage: Stage, first_id: u32, handles: &[ResHandle]) {
        if first_id + handles.len() as u32 > NUM_TEXTURE_BINDINGS {
            self.raise("bind_textures: slot out of range", DriverError::BadInput);
            return;
        }
        self.emit_handle_table(Opcode::BindTextures, stage, first_id, handles);
    }

    /// Bind image handles starting at slot `first_id`.
    pub fn bind_images(&mut self, stage: Stage, first_id: u32, handles: &[ResHandle]) {
        if first_id + handles.len() as u32 > NUM_IMAGE_BINDINGS {
            self.raise("bind_images: slot out of range", DriverError::BadInput);
            return;
        }
        self.emit_handle_table(Opcode::BindImages, stage, first_id, handles);
    }

    fn emit_handle_table(
        &mut self,
        op: Opcode,
        stage: Stage,
        first_id: u32,
        handles: &[ResHandle],
    ) {
        let mut payload = Vec::with_capacity(3 + handles.len());
        payload.push(stage as u32);
        payload.push(first_id);
        payload.push(handles.len() as u32);
        payload.extend(handles.iter().map(|handle| handle.raw()));
        self.emit(op, &payload);
    }

    /// Bind the image descriptor set at `set_addr`.
    pub fn bind_image_descriptor_set(&mut self, set_addr: GpuAddr, num_descriptors: u32) {
        if set_addr % u64::from(IMAGE_DESCRIPTOR_ALIGNMENT) != 0 {
            self.raise(
                "bind_image_descriptor_set: misaligned set address",
                DriverError::MisalignedData,
            );
            return;
        }
        let mut payload = Vec::with_capacity(3);
        push_addr(&mut payload, set_addr);
        payload.push(num_descriptors);
        self.emit(Opcode::BindImageDescriptorSet, &payload);
    }

    /// Bind the sampler descriptor set at `set_addr`.
    pub fn bind_sampler_descriptor_set(&mut self, set_addr: GpuAddr, num_descriptors: u32) {
        if set_addr % u64::from(SAMPLER_DESCRIPTOR_ALIGNMENT) != 0 {
            self.raise(
                "bind_sampler_descriptor_set: misaligned set address",
                DriverError::MisalignedData,
            );
            return;
        }
        let mut payload = Vec::with_capacity(3);
        push_addr(&mut payload, set_addr);
        payload.push(num_descriptors);
        self.emit(Opcode::BindSamplerDescriptorSet, &payload);
    }

    /// Bind color render targets and an optional depth target.
    pub fn bind_render_targets(
        &mut self,
        color_targets: &[&ImageView<'_>],
        depth_target: Option<&ImageView<'_>>,
    ) {
        if color_targets.len() as u32 > MAX_RENDER_TARGETS {
            self.raise("bind_render_targets: too many targets", DriverError::BadInput);
            return;
        }
        for view in color_targets.iter().chain(depth_target.iter()) {
            if view.validate().is_err() {
                self.raise("bind_render_targets: invalid view", DriverError::BadInput);
                return;
            }
        }
        self.require(ListUsage::GRAPHICS);
        let mut payload = Vec::with_capacity(2 + (color_targets.len() + 1) * 6);
        payload.push(color_targets.len() as u32);
        payload.push(depth_target.is_some() as u32);
        for view in color_targets {
            payload.extend_from_slice(&view.encode_record());
        }
        if let Some(view) = depth_target {
            payload.extend_from_slice(&view.encode_record());
        }
        self.emit(Opcode::BindRenderTargets, &payload);
    }

    /// Bind fixed-function rasterizer state.
    pub fn bind_rasterizer_state(&mut self, state: &RasterizerState) {
        self.require(ListUsage::GRAPHICS);
        self.emit(Opcode::BindRasterizerState, &state.pack());
    }

    /// Bind depth/stencil test state.
    pub fn bind_depth_stencil_state(&mut self, state: &DepthStencilState) {
        self.require(ListUsage::GRAPHICS);
        self.emit(Opcode::BindDepthStencilState, &state.pack());
    }

    /// Bind the vertex attribute table.
    pub fn bind_vtx_attrib_state(&mut self, attribs: &[VtxAttribState]) {
        if attribs.len() as u32 > MAX_VERTEX_ATTRIBS {
            self.raise("bind_vtx_attrib_state: too many attributes", DriverError::BadInput);
            return;
        }
        let mut payload = Vec::with_capacity(1 + attribs.len());
        payload.push(attribs.len() as u32);
        payload.extend(attribs.iter().map(|attrib| attrib.pack()));
        self.emit(Opcode::BindVtxAttribState, &payload);
    }

    /// Bind the vertex buffer fetch configuration table.
    pub fn bind_vtx_buffer_state(&mut self, buffers: &[VtxBufferState]) {
        if buffers.len() as u32 > MAX_VERTEX_BUFFERS {
            self.raise("bind_vtx_buffer_state: too many buffers", DriverError::BadInput);
            return;
        }
        let mut payload = Vec::with_capacity(1 + buffers.len() * 2);
        payload.push(buffers.len() as u32);
        for buffer in buffers {
            payload.push(buffer.stride);
            payload.push(buffer.divisor);
        }
        self.emit(Opcode::BindVtxBufferState, &payload);
    }

    /// Bind vertex buffer address ranges starting at slot `first_id`.
    pub fn bind_vtx_buffers(&mut self, first_id: u32, buffers: &[BufExtents]) {
        if first_id + buffers.len() as u32 > MAX_VERTEX_BUFFERS {
            self.raise("bind_vtx_buffers: slot out of range", DriverError::BadInput);
            return;
        }
        let mut payload = Vec::with_capacity(2 + buffers.len() * 3);
        payload.push(first_id);
        payload.push(buffers.len() as u32);
        for buffer in buffers {
            push_addr(&mut payload, buffer.addr);
            payload.push(buffer.size);
        }
        self.emit(Opcode::BindVtxBuffers, &payload);
    }

    /// Bind the index buffer.
    pub fn bind_idx_buffer(&mut self, format: IdxFormat, addr: GpuAddr) {
        let mut payload = Vec::with_capacity(3);
        payload.push(format as u32);
        push_addr(&mut payload, addr);
        self.emit(Opcode::BindIdxBuffer, &payload);
    }

    // ------------------------------------------------------------------
    // Dynamic state
    // ------------------------------------------------------------------

    /// Set viewport slots starting at `first_id`.
    pub fn set_viewports(&mut self, first_id: u32, viewports: &[Viewport]) {
        if first_id + viewports.len() as u32 > NUM_VIEWPORTS {
            self.raise("set_viewports: slot out of range", DriverError::BadInput);
            return;
        }
        let mut payload = Vec::with_capacity(2 + viewports.len() * 6);
        payload.push(first_id);
        payload.push(viewports.len() as u32);
        for viewport in viewports {
            payload.extend_from_slice(&[
                viewport.x.to_bits(),
                viewport.y.to_bits(),
                viewport.width.to_bits(),
                viewport.height.to_bits(),
                viewport.near.to_bits(),
                viewport.far.to_bits(),
            ]);
        }
        self.emit(Opcode::SetViewports, &payload);
    }

    /// Set scissor slots starting at `first_id`.
    pub fn set_scissors(&mut self, first_id: u32, scissors: &[Scissor]) {
        if first_id + scissors.len() as u32 > NUM_SCISSORS {
            self.raise("set_scissors: slot out of range", DriverError::BadInput);
            return;
        }
        let mut payload = Vec::with_capacity(2 + scissors.len() * 4);
        payload.push(first_id);
        payload.push(scissors.len() as u32);
        for scissor in scissors {
            payload.extend_from_slice(&[scissor.x, scissor.y, scissor.width, scissor.height]);
        }
        self.emit(Opcode::SetScissors, &payload);
    }

    /// Enable or disable the depth bounds test.
    pub fn set_depth_bounds(&mut self, enable: bool, near: f32, far: f32) {
        self.emit(
            Opcode::SetDepthBounds,
            &[enable as u32, near.to_bits(), far.to_bits()],
        );
    }

    /// Set stencil write mask, reference, and compare mask for the given
    /// faces.
    pub fn set_stencil(&mut self, face: Face, mask: u8, func_ref: u8, func_mask: u8) {
        self.emit(
            Opcode::SetStencil,
            &[
                face as u32,
                u32::from(mask) | u32::from(func_ref) << 8 | u32::from(func_mask) << 16,
            ],
        );
    }

    /// Enable or disable primitive restart with the given index.
    pub fn set_primitive_restart(&mut self, enable: bool, index: u32) {
        self.emit(Opcode::SetPrimitiveRestart, &[enable as u32, index]);
    }

    /// Set the tiled rendering tile size.
    pub fn set_tile_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            self.raise("set_tile_size: empty tile", DriverError::BadInput);
            return;
        }
        self.emit(Opcode::SetTileSize, &[width, height]);
    }

    /// Issue a tiled-cache control operation.
    pub fn tiled_cache_op(&mut self, op: TiledCacheOp) {
        self.emit(Opcode::TiledCacheOp, &[op as u32]);
    }

    // ------------------------------------------------------------------
    // Clears and discards
    // ------------------------------------------------------------------

    /// Clear channels of a bound color target.
    pub fn clear_color(&mut self, target_id: u32, mask: ClearMask, value: ClearColorValue) {
        if target_id >= MAX_RENDER_TARGETS {
            self.raise("clear_color: target out of range", DriverError::BadInput);
            return;
        }
        self.require(ListUsage::GRAPHICS);
        let raw = value.raw_words();
        self.emit(
            Opcode::ClearColor,
            &[target_id, mask.bits(), raw[0], raw[1], raw[2], raw[3]],
        );
    }

    /// Clear a bound color target with float components.
    pub fn clear_color_float(&mut self, target_id: u32, mask: ClearMask, rgba: [f32; 4]) {
        self.clear_color(target_id, mask, ClearColorValue::Float(rgba));
    }

    /// Clear a bound color target with signed integer components.
    pub fn clear_color_sint(&mut self, target_id: u32, mask: ClearMask, rgba: [i32; 4]) {
        self.clear_color(target_id, mask, ClearColorValue::Int(rgba));
    }

    /// Clear a bound color target with unsigned integer components.
    pub fn clear_color_uint(&mut self, target_id: u32, mask: ClearMask, rgba: [u32; 4]) {
        self.clear_color(target_id, mask, ClearColorValue::Uint(rgba));
    }

    /// Clear the bound depth/stencil target.
    pub fn clear_depth_stencil(
        &mut self,
        clear_depth: bool,
        depth_value: f32,
        stencil_mask: u8,
        stencil_value: u8,
    ) {
        self.require(ListUsage::GRAPHICS);
        self.emit(
            Opcode::ClearDepthStencil,
            &[
                clear_depth as u32,
                depth_value.to_bits(),
                u32::from(stencil_mask) | u32::from(stencil_value) << 8,
            ],
        );
    }

    /// Discard the contents of a bound color target.
    pub fn discard_color(&mut self, target_id: u32) {
        if target_id >= MAX_RENDER_TARGETS {
            self.raise("discard_color: target out of range", DriverError::BadInput);
            return;
        }
        self.require(ListUsage::GRAPHICS);
        self.emit(Opcode::DiscardColor, &[target_id]);
    }

    /// Discard the contents of the bound depth/stencil target.
    pub fn discard_depth_stencil(&mut self) {
        self.require(ListUsage::GRAPHICS);
        self.emit(Opcode::DiscardDepthStencil, &[]);
    }

    // ------------------------------------------------------------------
    // Draws and dispatches
    // ------------------------------------------------------------------

    /// Draw non-indexed geometry.
    pub fn draw(
        &mut self,
        prim: Primitive,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        self.require(ListUsage::GRAPHICS);
        self.emit(
            Opcode::Draw,
            &[
                prim as u32,
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            ],
        );
    }

    /// Draw with arguments fetched from GPU memory
    /// (a [`DrawIndirectData`](crate::state::DrawIndirectData) record).
    pub fn draw_indirect(&mut self, prim: Primitive, indirect: GpuAddr) {
        if indirect % 4 != 0 {
            self.raise("draw_indirect: misaligned argument address", DriverError::MisalignedData);
            return;
        }
        self.require(ListUsage::GRAPHICS);
        let mut payload = Vec::with_capacity(3);
        payload.push(prim as u32);
        push_addr(&mut payload, indirect);
        self.emit(Opcode::DrawIndirect, &payload);
    }

    /// Draw indexed geometry.
    pub fn draw_indexed(
        &mut self,
        prim: Primitive,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.require(ListUsage::GRAPHICS);
        self.emit(
            Opcode::DrawIndexed,
            &[
                prim as u32,
                index_count,
                instance_count,
                first_index,
                vertex_offset as u32,
                first_instance,
            ],
        );
    }

    /// Draw indexed geometry with arguments fetched from GPU memory.
    pub fn draw_indexed_indirect(&mut self, prim: Primitive, indirect: GpuAddr) {
        if indirect % 4 != 0 {
            self.raise(
                "draw_indexed_indirect: misaligned argument address",
                DriverError::MisalignedData,
            );
            return;
        }
        self.require(ListUsage::GRAPHICS);
        let mut payload = Vec::with_capacity(3);
        payload.push(prim as u32);
        push_addr(&mut payload, indirect);
        self.emit(Opcode::DrawIndexedIndirect, &payload);
    }

    /// Dispatch a compute grid.
    pub fn dispatch_compute(&mut self, groups_x: u32, groups_y: u32, groups_z: u32) {
        self.require(ListUsage::COMPUTE);
        self.emit(Opcode::DispatchCompute, &[groups_x, groups_y, groups_z]);
    }

    /// Dispatch a compute grid with arguments fetched from GPU memory.
    pub fn dispatch_compute_indirect(&mut self, indirect: GpuAddr) {
        if indirect % 4 != 0 {
            self.raise(
                "dispatch_compute_indirect: misaligned argument address",
                DriverError::MisalignedData,
            );
            return;
        }
        self.require(ListUsage::COMPUTE);
        let mut payload = Vec::with_capacity(2);
        push_addr(&mut payload, indirect);
        self.emit(Opcode::DispatchComputeIndirect, &payload);
    }

    // ------------------------------------------------------------------
    // Data transfer
    // ------------------------------------------------------------------

    /// Update a range of a bound uniform buffer with inline data.
    pub fn push_constants(
        &mut self,
        ubo_addr: GpuAddr,
        ubo_size: u32,
        offset: u32,
        data: &[u8],
    ) {
        if ubo_addr % u64::from(UNIFORM_BUF_ALIGNMENT) != 0 {
            self.raise("push_constants: misaligned uniform buffer", DriverError::MisalignedData);
            return;
        }
        if ubo_size > UNIFORM_BUF_MAX_SIZE
            || offset
                .checked_add(data.len() as u32)
                .map_or(true, |end| end > ubo_size)
        {
            self.raise("push_constants: range outside the buffer", DriverError::BadInput);
            return;
        }
        let mut payload = Vec::with_capacity(4 + (data.len() + 3) / 4);
        push_addr(&mut payload, ubo_addr);
        payload.push(offset);
        payload.push(data.len() as u32);
        push_packed_bytes(&mut payload, data);
        self.emit(Opcode::PushConstants, &payload);
    }

    /// Write inline data to GPU memory at `addr`.
    pub fn push_data(&mut self, addr: GpuAddr, data: &[u8]) {
        if addr % 4 != 0 {
            self.raise("push_data: misaligned destination", DriverError::MisalignedData);
            return;
        }
        self.require(ListUsage::TRANSFER);
        let mut payload = Vec::with_capacity(3 + (data.len() + 3) / 4);
        push_addr(&mut payload, addr);
        payload.push(data.len() as u32);
        push_packed_bytes(&mut payload, data);
        self.emit(Opcode::PushData, &payload);
    }

    /// Copy a byte range between GPU addresses.
    pub fn copy_buffer(&mut self, src_addr: GpuAddr, dst_addr: GpuAddr, size: u32) {
        self.require(ListUsage::TRANSFER);
        let mut payload = Vec::with_capacity(5);
        push_addr(&mut payload, src_addr);
        push_addr(&mut payload, dst_addr);
        payload.push(size);
        self.emit(Opcode::CopyBuffer, &payload);
    }

    /// Copy a region between images without scaling.
    pub fn copy_image(
        &mut self,
        src_view: &ImageView<'_>,
        src_rect: &BlitRect,
        dst_view: &ImageView<'_>,
        dst_rect: &BlitRect,
        flags: BlitFlags,
    ) {
        if src_view.validate().is_err() || dst_view.validate().is_err() {
            self.raise("copy_image: invalid view", DriverError::BadInput);
            return;
        }
        self.require(ListUsage::TRANSFER);
        let mut payload = Vec::with_capacity(25);
        payload.extend_from_slice(&src_view.encode_record());
        push_rect(&mut payload, src_rect);
        payload.extend_from_slice(&dst_view.encode_record());
        push_rect(&mut payload, dst_rect);
        payload.push(flags.bits());
        self.emit(Opcode::CopyImage, &payload);
    }

    /// Blit a region between images with scaling and filtering.
    ///
    /// `factor` biases the sample positions of the stretch filter.
    pub fn blit_image(
        &mut self,
        src_view: &ImageView<'_>,
        src_rect: &BlitRect,
        dst_view: &ImageView<'_>,
        dst_rect: &BlitRect,
        flags: BlitFlags,
        factor: u32,
    ) {
        if src_view.validate().is_err() || dst_view.validate().is_err() {
            self.raise("blit_image: invalid view", DriverError::BadInput);
            return;
        }
        self.require(ListUsage::TRANSFER);
        let mut payload = Vec::with_capacity(26);
        payload.extend_from_slice(&src_view.encode_record());
        push_rect(&mut payload, src_rect);
        payload.extend_from_slice(&dst_view.encode_record());
        push_rect(&mut payload, dst_rect);
        payload.push(flags.bits());
        payload.push(factor);
        self.emit(Opcode::BlitImage, &payload);
    }

    /// Resolve a multisampled image into a single-sampled one.
    pub fn resolve_image(&mut self, src_view: &ImageView<'_>, dst_view: &ImageView<'_>) {
        if src_view.validate().is_err() || dst_view.validate().is_err() {
            self.raise("resolve_image: invalid view", DriverError::BadInput);
            return;
        }
        self.require(ListUsage::TRANSFER);
        let mut payload = Vec::with_capacity(12);
        payload.extend_from_slice(&src_view.encode_record());
        payload.extend_from_slice(&dst_view.encode_record());
        self.emit(Opcode::ResolveImage, &payload);
    }

    /// Copy linear buffer data into an image region.
    pub fn copy_buffer_to_image(
        &mut self,
        src: &CopyBufLayout,
        dst_view: &ImageView<'_>,
        dst_rect: &BlitRect,
        flags: BlitFlags,
    ) {
        if dst_view.validate().is_err() {
            self.raise("copy_buffer_to_image: invalid view", DriverError::BadInput);
            return;
        }
        self.require(ListUsage::TRANSFER);
        let mut payload = Vec::with_capacity(17);
        push_addr(&mut payload, src.addr);
        payload.push(src.row_length);
        payload.push(src.image_height);
        payload.extend_from_slice(&dst_view.encode_record());
        push_rect(&mut payload, dst_rect);
        payload.push(flags.bits());
        self.emit(Opcode::CopyBufferToImage, &payload);
    }

    /// Copy an image region out to linear buffer data.
    pub fn copy_image_to_buffer(
        &mut self,
        src_view: &ImageView<'_>,
        src_rect: &BlitRect,
        dst: &CopyBufLayout,
        flags: BlitFlags,
    ) {
        if src_view.validate().is_err() {
            self.raise("copy_image_to_buffer: invalid view", DriverError::BadInput);
            return;
        }
        self.require(ListUsage::TRANSFER);
        let mut payload = Vec::with_capacity(17);
        payload.extend_from_slice(&src_view.encode_record());
        push_rect(&mut payload, src_rect);
        push_addr(&mut payload, dst.addr);
        payload.push(dst.row_length);
        payload.push(dst.image_height);
        payload.push(flags.bits());
        self.emit(Opcode::CopyImageToBuffer, &payload);
    }

    // ------------------------------------------------------------------
    // Presentation (queue internal)
    // ------------------------------------------------------------------

    /// Encode a present: the slot returns to the display system when the
    /// GPU reaches this point. Reached only through `Queue::present_image`.
    pub(crate) fn encode_present(&mut self, swapchain: &Arc<SwapchainState>, slot: u32) {
        let index = self.swapchain_index(swapchain);
        self.emit(Opcode::PresentImage, &[index, slot]);
    }
}

/// Append byte data packed little-endian into words, zero-padded to the
/// word boundary.
fn push_packed_bytes(payload: &mut Vec<u32>, data: &[u8]) {
    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        payload.push(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    let rest = chunks.remainder();
    if !rest.is_empty() {
        let mut tail = [0u8; 4];
        tail[..rest.len()].copy_from_slice(rest);
        payload.push(u32::from_le_bytes(tail));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::opcode::split_header;
    use crate::device::{Device, DeviceConfig};
    use crate::memory::{MemoryBlock, MemoryBlockConfig};

    fn recorder() -> (Device, MemoryBlock, CommandBuffer) {
        let device = Device::new(DeviceConfig::new());
        let block = MemoryBlock::new(&device, &MemoryBlockConfig::new(0x4000)).unwrap();
        let mut cmdbuf = CommandBuffer::new(&device);
        cmdbuf.add_memory(&block, 0, 0x4000).unwrap();
        (device, block, cmdbuf)
    }

    fn read_words(block: &MemoryBlock, count: u32) -> Vec<u32> {
        (0..count).map(|i| unsafe { block.read_u32(4 * i) }).collect()
    }

    #[test]
    fn draw_encodes_its_arguments_in_order() {
        let (_device, block, mut cmdbuf) = recorder();
        cmdbuf.draw(Primitive::Triangles, 36, 2, 6, 1);
        let list = cmdbuf.finish_list().unwrap();
        assert!(list.usage().contains(ListUsage::GRAPHICS));

        let words = read_words(&block, 6);
        let (op, count) = split_header(words[0]);
        assert_eq!(op, Opcode::Draw as u8);
        assert_eq!(count, 5);
        assert_eq!(&words[1..], &[Primitive::Triangles as u32, 36, 2, 6, 1]);
    }

    #[test]
    fn dispatch_marks_compute_and_copies_mark_transfer() {
        let (_device, _block, mut cmdbuf) = recorder();
        cmdbuf.dispatch_compute(8, 8, 1);
        cmdbuf.copy_buffer(0x4000_0000, 0x4000_1000, 0x100);
        let list = cmdbuf.finish_list().unwrap();
        assert!(list.usage().contains(ListUsage::COMPUTE));
        assert!(list.usage().contains(ListUsage::TRANSFER));
        assert!(!list.usage().contains(ListUsage::GRAPHICS));
    }

    #[test]
    fn state_binds_require_no_capability() {
        let (_device, _block, mut cmdbuf) = recorder();
        cmdbuf.set_viewports(0, &[Viewport::default()]);
        cmdbuf.set_scissors(0, &[Scissor::default()]);
        cmdbuf.bind_idx_buffer(IdxFormat::Uint16, 0x4000_0000);
        let list = cmdbuf.finish_list().unwrap();
        assert!(list.usage().is_empty());
    }

    #[test]
    fn push_data_packs_and_pads_bytes() {
        let (_device, block, mut cmdbuf) = recorder();
        cmdbuf.push_data(0x4000_0000, &[0x11, 0x22, 0x33, 0x44, 0x55]);
        cmdbuf.finish_list().unwrap();

        let words = read_words(&block, 6);
        let (op, count) = split_header(words[0]);
        assert_eq!(op, Opcode::PushData as u8);
        assert_eq!(count, 5); // addr lo/hi, byte count, two data words
        assert_eq!(words[3], 5);
        assert_eq!(words[4], 0x4433_2211);
        assert_eq!(words[5], 0x0000_0055);
    }

    #[test]
    fn out_of_range_slots_raise_the_error_callback() {
        let reported = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = reported.clone();
        let mut config = DeviceConfig::new();
        config.error_callback = Some(std::sync::Arc::new(move |context: &str, error| {
            sink.lock().unwrap().push((context.to_string(), error));
        }));
        let device = Device::new(config);
        let block = MemoryBlock::new(&device, &MemoryBlockConfig::new(0x1000)).unwrap();
        let mut cmdbuf = CommandBuffer::new(&device);
        cmdbuf.add_memory(&block, 0, 0x1000).unwrap();

        cmdbuf.bind_uniform_buffers(
            Stage::Fragment,
            NUM_UNIFORM_BUFS,
            &[BufExtents::new(0, 0x100)],
        );
        cmdbuf.set_viewports(NUM_VIEWPORTS, &[Viewport::default()]);

        let reports = reported.lock().unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].1, DriverError::BadInput);

        // Nothing was encoded by the rejected calls.
        drop(reports);
        let list = cmdbuf.finish_list().unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn uniform_buffers_must_be_aligned() {
        let reported = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = reported.clone();
        let mut config = DeviceConfig::new();
        config.error_callback = Some(std::sync::Arc::new(move |_: &str, error| {
            sink.lock().unwrap().push(error);
        }));
        let device = Device::new(config);
        let block = MemoryBlock::new(&device, &MemoryBlockConfig::new(0x1000)).unwrap();
        let mut cmdbuf = CommandBuffer::new(&device);
        cmdbuf.add_memory(&block, 0, 0x1000).unwrap();

        cmdbuf.bind_uniform_buffers(Stage::Vertex, 0, &[BufExtents::new(0x4000_0044, 0x100)]);
        assert_eq!(
            reported.lock().unwrap().as_slice(),
            &[DriverError::MisalignedData]
        );
    }

    #[test]
    fn signal_fence_rearms_at_encode_time() {
        let (_device, _block, mut cmdbuf) = recorder();
        let fence = Fence::new();
        assert!(fence.is_signaled());
        cmdbuf.signal_fence(&fence, false);
        assert!(!fence.is_signaled());
        let list = cmdbuf.finish_list().unwrap();
        assert_eq!(list.data.fences.len(), 1);
    }

    #[test]
    fn fence_table_interns_repeated_references() {
        let (_device, _block, mut cmdbuf) = recorder();
        let fence = Fence::new();
        cmdbuf.wait_fence(&fence);
        cmdbuf.signal_fence(&fence, false);
        cmdbuf.wait_fence(&fence);
        let list = cmdbuf.finish_list().unwrap();
        assert_eq!(list.data.fences.len(), 1);
    }
}
