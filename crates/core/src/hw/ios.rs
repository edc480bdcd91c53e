use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::state::{DoState, PointerWrap};

/// Low-level IOS state (Wii only).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ios {
    /// Open file descriptors and the device path each one refers to.
    pub fds: BTreeMap<u32, String>,
    /// Requests that have been queued but not yet replied to.
    pub pending_replies: BTreeSet<u32>,
    pub title_id: Option<u64>,
    pub hle: IosHle,
}

impl Ios {
    pub fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        self.fds.do_state(p);
        self.pending_replies.do_state(p);
        self.title_id.do_state(p);
    }
}

/// An emulated `/dev/...` device registered with the HLE kernel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HleDevice {
    pub path: String,
    pub is_active: bool,
}

/// High-level IOS kernel state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IosHle {
    pub active_version: u32,
    pub devices: Vec<HleDevice>,
    pub reply_queue: VecDeque<u32>,
    pub ack_queue: VecDeque<u32>,
    pub last_reply_time: u64,
}

impl Default for IosHle {
    fn default() -> Self {
        Self {
            active_version: 58,
            devices: Vec::new(),
            reply_queue: VecDeque::new(),
            ack_queue: VecDeque::new(),
            last_reply_time: 0,
        }
    }
}

impl IosHle {
    /// Returns `false` when the state was saved under a different IOS version.
    pub fn do_state(&mut self, p: &mut PointerWrap<'_>) -> bool {
        let mut version = self.active_version;
        version.do_state(p);
        if p.is_read() && version != self.active_version {
            tracing::error!(saved = version, running = self.active_version, "IOS version mismatch");
            return false;
        }
        p.do_each_element(&mut self.devices, |p, device| {
            device.path.do_state(p);
            device.is_active.do_state(p);
        });
        self.reply_queue.do_state(p);
        self.ack_queue.do_state(p);
        self.last_reply_time.do_state(p);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hle_devices_are_rebuilt_on_load() {
        let mut source = IosHle::default();
        source.devices = vec![
            HleDevice { path: "/dev/es".into(), is_active: true },
            HleDevice { path: "/dev/fs".into(), is_active: false },
        ];
        source.reply_queue.push_back(7);

        let mut buf = Vec::new();
        assert!(source.do_state(&mut PointerWrap::writer(&mut buf)));

        let mut target = IosHle::default();
        target.devices.push(HleDevice { path: "/dev/stale".into(), is_active: true });
        assert!(target.do_state(&mut PointerWrap::reader(&buf)));
        assert_eq!(target, source);
    }
}
