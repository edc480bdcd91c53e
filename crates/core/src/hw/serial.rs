use std::fmt;

use crate::state::{DoState, PointerWrap};

pub const MAX_SI_CHANNELS: usize = 4;
pub const SI_BUFFER_SIZE: usize = 128;

/// Kind of device plugged into a serial interface port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SiDeviceType {
    #[default]
    None,
    GcController,
    Keyboard,
}

impl SiDeviceType {
    pub fn to_u32(self) -> u32 {
        match self {
            SiDeviceType::None => 0,
            SiDeviceType::GcController => 1,
            SiDeviceType::Keyboard => 2,
        }
    }

    /// Unknown values decode as an empty port.
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => SiDeviceType::GcController,
            2 => SiDeviceType::Keyboard,
            _ => SiDeviceType::None,
        }
    }
}

/// A device attached to one serial interface channel.
pub trait SiDevice: fmt::Debug + Send {
    fn device_type(&self) -> SiDeviceType;
    fn do_state(&mut self, p: &mut PointerWrap<'_>);
    fn clone_box(&self) -> Box<dyn SiDevice>;
}

impl Clone for Box<dyn SiDevice> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Build a fresh device of the given type.
pub fn create_device(kind: SiDeviceType) -> Box<dyn SiDevice> {
    match kind {
        SiDeviceType::None => Box::new(NullDevice),
        SiDeviceType::GcController => Box::new(GcController::default()),
        SiDeviceType::Keyboard => Box::new(Keyboard::default()),
    }
}

#[derive(Debug, Clone, Default)]
pub struct NullDevice;

impl SiDevice for NullDevice {
    fn device_type(&self) -> SiDeviceType {
        SiDeviceType::None
    }

    fn do_state(&mut self, _p: &mut PointerWrap<'_>) {}

    fn clone_box(&self) -> Box<dyn SiDevice> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcController {
    pub origin: [u8; 10],
    pub calibrated: bool,
    pub last_button_combo: u32,
    pub timer_button: u32,
    pub rumble_active: bool,
}

impl SiDevice for GcController {
    fn device_type(&self) -> SiDeviceType {
        SiDeviceType::GcController
    }

    fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        p.do_bytes(&mut self.origin);
        self.calibrated.do_state(p);
        self.last_button_combo.do_state(p);
        self.timer_button.do_state(p);
        self.rumble_active.do_state(p);
    }

    fn clone_box(&self) -> Box<dyn SiDevice> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub counter: u8,
    pub pending_keys: Vec<u8>,
}

impl SiDevice for Keyboard {
    fn device_type(&self) -> SiDeviceType {
        SiDeviceType::Keyboard
    }

    fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        self.counter.do_state(p);
        p.do_byte_vec(&mut self.pending_keys);
    }

    fn clone_box(&self) -> Box<dyn SiDevice> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone)]
pub struct SiChannel {
    pub in_hi: u32,
    pub in_lo: u32,
    pub out: u32,
    pub has_recent_device_change: bool,
    pub device: Box<dyn SiDevice>,
}

impl Default for SiChannel {
    fn default() -> Self {
        Self {
            in_hi: 0,
            in_lo: 0,
            out: 0,
            has_recent_device_change: false,
            device: create_device(SiDeviceType::None),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SerialInterface {
    pub channels: [SiChannel; MAX_SI_CHANNELS],
    pub poll: u32,
    pub com_csr: u32,
    pub status_reg: u32,
    pub exi_clock_count: u32,
    pub si_buffer: [u8; SI_BUFFER_SIZE],
}

impl Default for SerialInterface {
    fn default() -> Self {
        Self {
            channels: Default::default(),
            poll: 0,
            com_csr: 0,
            status_reg: 0,
            exi_clock_count: 0,
            si_buffer: [0; SI_BUFFER_SIZE],
        }
    }
}

impl SerialInterface {
    /// Replace the device on `channel` and flag the change for the guest.
    pub fn attach(&mut self, channel: usize, kind: SiDeviceType) {
        if let Some(slot) = self.channels.get_mut(channel) {
            slot.device = create_device(kind);
            slot.has_recent_device_change = true;
        }
    }

    pub fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        for channel in self.channels.iter_mut() {
            channel.in_hi.do_state(p);
            channel.in_lo.do_state(p);
            channel.out.do_state(p);
            channel.has_recent_device_change.do_state(p);

            let current = channel.device.device_type();
            let mut kind = current.to_u32();
            kind.do_state(p);

            // The saved device differs from the plugged one: swap it before
            // reading its own state.
            let saved = SiDeviceType::from_u32(kind);
            if saved != current {
                channel.device = create_device(saved);
            }
            channel.device.do_state(p);
        }

        self.poll.do_state(p);
        self.com_csr.do_state(p);
        self.status_reg.do_state(p);
        self.exi_clock_count.do_state(p);
        p.do_bytes(&mut self.si_buffer);
    }
}
