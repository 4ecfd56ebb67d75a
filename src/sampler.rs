//! Image samplers.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::ffi::{self, ClSampler, CL_FALSE, CL_SUCCESS, CL_TRUE};
use crate::handle::facade;
use crate::types::{AddressingMode, FilterMode};

/// Sampler attributes.
pub mod attr {
    use crate::ffi::ClContext;
    use crate::info::{attributes, Bool, HandleOf, Uint};

    attributes!(Sampler {
        REFERENCE_COUNT: Uint = CL_SAMPLER_REFERENCE_COUNT;
        CONTEXT: HandleOf<ClContext> = CL_SAMPLER_CONTEXT;
        NORMALIZED_COORDS: Bool = CL_SAMPLER_NORMALIZED_COORDS;
        ADDRESSING_MODE: Uint = CL_SAMPLER_ADDRESSING_MODE;
        FILTER_MODE: Uint = CL_SAMPLER_FILTER_MODE;
    });
}

facade! {
    pub struct Sampler(ClSampler): Sampler via clGetSamplerInfo;
}

impl Sampler {
    pub fn new(
        context: &Context,
        normalized_coords: bool,
        addressing: AddressingMode,
        filter: FilterMode,
    ) -> Result<Self> {
        let ctx = context.handle().pin()?;
        let mut status = CL_SUCCESS;
        let raw = unsafe {
            context.runtime().api().clCreateSampler(
                ctx.raw(),
                if normalized_coords { CL_TRUE } else { CL_FALSE },
                addressing.to_raw(),
                filter.to_raw(),
                &mut status,
            )
        };
        ffi::error::check_call(status, "clCreateSampler")?;
        Self::wrap(context.runtime(), raw)
    }

    pub fn reference_count(&self) -> Result<u32> {
        self.info(attr::REFERENCE_COUNT)
    }

    pub fn context(&self) -> Result<Context> {
        match self.info(attr::CONTEXT)? {
            Some(raw) => Context::retain_from(self.runtime(), raw),
            None => Err(Error::NullHandle {
                kind: crate::handle::ResourceKind::Context,
            }),
        }
    }

    pub fn normalized_coords(&self) -> Result<bool> {
        self.info(attr::NORMALIZED_COORDS)
    }

    pub fn addressing_mode(&self) -> Result<AddressingMode> {
        let raw = self.info(attr::ADDRESSING_MODE)?;
        AddressingMode::from_raw(raw)
            .ok_or_else(|| attr::ADDRESSING_MODE.unknown_value(raw))
    }

    pub fn filter_mode(&self) -> Result<FilterMode> {
        let raw = self.info(attr::FILTER_MODE)?;
        FilterMode::from_raw(raw)
            .ok_or_else(|| attr::FILTER_MODE.unknown_value(raw))
    }
}
