use super::{Shader, ShaderConfig, Stage};
use crate::errors::{DriverError, DriverResult};
use crate::limits::{is_aligned_u32, GpuAddr, SHADER_CODE_ALIGNMENT};
use crate::memory::MemoryFlags;

impl Shader {
    /// Validate a reference to pre-compiled code inside a code block.
    pub fn new(config: &ShaderConfig) -> DriverResult<Self> {
        if !config.code_mem.flags().contains(MemoryFlags::CODE) {
            return Err(DriverError::BadMemFlags);
        }
        if !is_aligned_u32(config.code_offset, SHADER_CODE_ALIGNMENT) {
            return Err(DriverError::MisalignedData);
        }
        if config.code_size == 0 {
            return Err(DriverError::BadInput);
        }
        let end = config
            .code_offset
            .checked_add(config.code_size)
            .ok_or(DriverError::BadInput)?;
        if end > config.code_mem.size() {
            return Err(DriverError::BadInput);
        }
        Ok(Self {
            code_mem: config.code_mem.clone(),
            code_offset: config.code_offset,
            stage: config.stage,
            program_id: config.program_id,
        })
    }

    /// The stage this shader executes at.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// True for any successfully constructed shader.
    pub fn is_valid(&self) -> bool {
        // Construction already validated everything; the accessor exists
        // for callers holding shaders of uncertain provenance.
        self.code_mem.size() > 0
    }

    /// GPU address of the first code byte.
    pub(crate) fn gpu_addr(&self) -> GpuAddr {
        self.code_mem.gpu_addr() + u64::from(self.code_offset)
    }

    /// Hardware program slot.
    pub(crate) fn program_id(&self) -> u32 {
        self.program_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Device, DeviceConfig};
    use crate::memory::{MemoryBlock, MemoryBlockConfig, MemoryFlags};

    fn code_block(device: &Device) -> MemoryBlock {
        let mut config = MemoryBlockConfig::new(0x1000);
        config.flags = MemoryFlags::default() | MemoryFlags::CODE;
        MemoryBlock::new(device, &config).unwrap()
    }

    #[test]
    fn shader_requires_a_code_block() {
        let device = Device::new(DeviceConfig::new());
        let plain = MemoryBlock::new(&device, &MemoryBlockConfig::new(0x1000)).unwrap();
        let result = Shader::new(&ShaderConfig {
            code_mem: plain,
            code_offset: 0,
            code_size: 0x100,
            stage: Stage::Vertex,
            program_id: 0,
        });
        assert_eq!(result.err(), Some(DriverError::BadMemFlags));
    }

    #[test]
    fn code_offset_must_be_aligned_and_in_bounds() {
        let device = Device::new(DeviceConfig::new());
        let block = code_block(&device);

        let misaligned = Shader::new(&ShaderConfig {
            code_mem: block.clone(),
            code_offset: 0x80,
            code_size: 0x100,
            stage: Stage::Fragment,
            program_id: 0,
        });
        assert_eq!(misaligned.err(), Some(DriverError::MisalignedData));

        let out_of_bounds = Shader::new(&ShaderConfig {
            code_mem: block.clone(),
            code_offset: 0xF00,
            code_size: 0x200,
            stage: Stage::Fragment,
            program_id: 0,
        });
        assert_eq!(out_of_bounds.err(), Some(DriverError::BadInput));

        let shader = Shader::new(&ShaderConfig {
            code_mem: block,
            code_offset: 0x100,
            code_size: 0x200,
            stage: Stage::Fragment,
            program_id: 2,
        })
        .unwrap();
        assert!(shader.is_valid());
        assert_eq!(shader.stage(), Stage::Fragment);
    }
}
