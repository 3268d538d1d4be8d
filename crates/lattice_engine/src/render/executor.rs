//! Device-owning executor
//!
//! The executor owns the boxed [`RenderDevice`] and the receiving side
//! of the render-task queue. Because the device is reachable from
//! nowhere else, "device calls happen on exactly one thread" holds
//! structurally: whichever thread owns the executor is the render
//! thread.

use crate::render::device::{DeviceError, DrawCall, RenderDevice};
use crate::render::resources::RenderTask;
use crate::tasks::MtQueue;

/// Executes deferred device work and draw submission.
pub struct DeviceExecutor {
    device: Box<dyn RenderDevice>,
    tasks: MtQueue<RenderTask>,
}

impl DeviceExecutor {
    pub(crate) fn new(device: Box<dyn RenderDevice>, tasks: MtQueue<RenderTask>) -> Self {
        Self { device, tasks }
    }

    /// Run every task queued so far. Call once per frame, before any
    /// resource constructed this frame is consumed.
    ///
    /// Bounded by the queue length observed at entry, so producers
    /// pushing concurrently cannot starve the frame.
    pub fn drain(&mut self) -> usize {
        let budget = self.tasks.len();
        let mut executed = 0;
        for _ in 0..budget {
            let Some(task) = self.tasks.try_pop() else {
                break;
            };
            task(self.device.as_mut());
            executed += 1;
        }
        if executed > 0 {
            log::trace!("executed {executed} device tasks");
        }
        executed
    }

    /// Submit a list of instanced draw calls to the device.
    ///
    /// # Errors
    ///
    /// Propagates the first submission failure from the backend.
    pub fn submit(&mut self, calls: &[DrawCall]) -> Result<(), DeviceError> {
        for call in calls {
            self.device.submit(call)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::headless::HeadlessDevice;
    use crate::render::resources::ResourceManager;

    #[test]
    fn drain_on_empty_queue_is_a_no_op() {
        let (_resources, mut executor) = ResourceManager::with_device(Box::new(HeadlessDevice::new()));
        assert_eq!(executor.drain(), 0);
    }

    #[test]
    fn drain_reports_task_count() {
        let device = HeadlessDevice::new();
        let (resources, mut executor) = ResourceManager::with_device(Box::new(device));

        resources.create_program(
            "a",
            crate::render::device::ProgramDescriptor::new("vs", "fs"),
        );
        resources.create_program(
            "b",
            crate::render::device::ProgramDescriptor::new("vs2", "fs2"),
        );

        assert_eq!(executor.drain(), 2);
        assert_eq!(executor.drain(), 0);
    }
}
