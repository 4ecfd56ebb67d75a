//! Events: completion tracking for enqueued commands, plus user events.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::ffi::{self, ClEvent, CL_SUCCESS};
use crate::handle::{facade, OwnedHandle};
use crate::info::Ulong;
use crate::marshal::with_pinned_handles;
use crate::queue::CommandQueue;
use crate::types::{CommandExecutionStatus, ProfilingInfo};

/// Event attributes.
pub mod attr {
    use crate::ffi::{ClCommandQueue, ClContext};
    use crate::info::{attributes, HandleOf, Int, Uint, Ulong};

    attributes!(Event {
        COMMAND_QUEUE: HandleOf<ClCommandQueue> = CL_EVENT_COMMAND_QUEUE;
        CONTEXT: HandleOf<ClContext> = CL_EVENT_CONTEXT;
        COMMAND_TYPE: Uint = CL_EVENT_COMMAND_TYPE;
        COMMAND_EXECUTION_STATUS: Int = CL_EVENT_COMMAND_EXECUTION_STATUS;
        REFERENCE_COUNT: Uint = CL_EVENT_REFERENCE_COUNT;
    });

    attributes!(EventProfiling {
        PROFILING_COMMAND_QUEUED: Ulong = CL_PROFILING_COMMAND_QUEUED;
        PROFILING_COMMAND_SUBMIT: Ulong = CL_PROFILING_COMMAND_SUBMIT;
        PROFILING_COMMAND_START: Ulong = CL_PROFILING_COMMAND_START;
        PROFILING_COMMAND_END: Ulong = CL_PROFILING_COMMAND_END;
    });
}

facade! {
    /// Completion state of one enqueued command or a user event.
    pub struct Event(ClEvent): Event via clGetEventInfo;
}

/// Lower an optional wait list to the handles the marshal pins.
pub(crate) fn wait_handles<'a>(events: Option<&[&'a Event]>) -> Option<Vec<&'a OwnedHandle<ClEvent>>> {
    events.map(Event::handles)
}

impl Event {
    /// A user event, completed by [`set_status`](Self::set_status).
    pub fn user(context: &Context) -> Result<Self> {
        let ctx = context.handle().pin()?;
        let mut status = CL_SUCCESS;
        let raw = unsafe { context.runtime().api().clCreateUserEvent(ctx.raw(), &mut status) };
        ffi::error::check_call(status, "clCreateUserEvent")?;
        Self::wrap(context.runtime(), raw)
    }

    /// Complete a user event, or fail it with a negative error status.
    pub fn set_status(&self, status: CommandExecutionStatus) -> Result<()> {
        let event = self.handle.pin()?;
        let code = unsafe {
            self.runtime()
                .api()
                .clSetUserEventStatus(event.raw(), status.to_raw())
        };
        ffi::error::check_call(code, "clSetUserEventStatus")
    }

    /// Block until this event completes.
    pub fn wait(&self) -> Result<()> {
        Self::wait_all(&[self])
    }

    /// Block until every event in `events` completes.
    pub fn wait_all(events: &[&Event]) -> Result<()> {
        let Some(first) = events.first() else {
            return Ok(());
        };
        let api = first.runtime().api();
        let handles = Event::handles(events);
        let code = with_pinned_handles(Some(handles.as_slice()), |list| unsafe {
            api.clWaitForEvents(list.len(), list.as_ptr())
        })?;
        ffi::error::check_call(code, "clWaitForEvents")
    }

    pub fn execution_status(&self) -> Result<CommandExecutionStatus> {
        let raw = self.info(attr::COMMAND_EXECUTION_STATUS)?;
        CommandExecutionStatus::from_raw(raw)
            .ok_or_else(|| attr::COMMAND_EXECUTION_STATUS.unknown_value(raw))
    }

    /// Native command type code.
    pub fn command_type(&self) -> Result<u32> {
        self.info(attr::COMMAND_TYPE)
    }

    pub fn reference_count(&self) -> Result<u32> {
        self.info(attr::REFERENCE_COUNT)
    }

    /// The queue the command was enqueued on. `None` for user events.
    pub fn command_queue(&self) -> Result<Option<CommandQueue>> {
        self.info(attr::COMMAND_QUEUE)?
            .map(|raw| CommandQueue::retain_from(self.runtime(), raw))
            .transpose()
    }

    pub fn context(&self) -> Result<Context> {
        match self.info(attr::CONTEXT)? {
            Some(raw) => Context::retain_from(self.runtime(), raw),
            None => Err(Error::NullHandle {
                kind: crate::handle::ResourceKind::Context,
            }),
        }
    }

    /// One profiling counter, in device nanoseconds.
    ///
    /// Fails with `CL_PROFILING_INFO_NOT_AVAILABLE` unless the queue was
    /// created with profiling enabled and the command has completed.
    pub fn profiling(&self, counter: ProfilingInfo) -> Result<u64> {
        let attr: crate::info::Attribute<Ulong> = match counter {
            ProfilingInfo::Queued => attr::PROFILING_COMMAND_QUEUED,
            ProfilingInfo::Submit => attr::PROFILING_COMMAND_SUBMIT,
            ProfilingInfo::Start => attr::PROFILING_COMMAND_START,
            ProfilingInfo::End => attr::PROFILING_COMMAND_END,
        };
        self.handle.query(attr, |api, raw, id, size, value, size_ret| unsafe {
            api.clGetEventProfilingInfo(raw, id, size, value, size_ret)
        })
    }

    /// Start-to-end execution time in nanoseconds.
    pub fn duration(&self) -> Result<u64> {
        let start = self.profiling(ProfilingInfo::Start)?;
        let end = self.profiling(ProfilingInfo::End)?;
        Ok(end.saturating_sub(start))
    }
}
