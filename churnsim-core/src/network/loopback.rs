/// Node-local device. It has no link to churn, so it exposes no availability
/// controls at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopbackNetDevice;

impl LoopbackNetDevice {
    pub fn new() -> Self {
        Self
    }
}
