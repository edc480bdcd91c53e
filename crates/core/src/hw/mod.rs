//! Emulated hardware blocks and the order in which a save state walks them.

pub mod audio;
pub mod dsp;
pub mod dvd;
pub mod exi;
pub mod gpfifo;
pub mod ios;
pub mod memory;
pub mod processor;
pub mod serial;
pub mod video;

use crate::state::{checkpoint, require, PointerWrap, StateResult, StateRoot};

pub use audio::AudioInterface;
pub use dsp::Dsp;
pub use dvd::DvdInterface;
pub use exi::ExpansionInterface;
pub use gpfifo::GpFifo;
pub use ios::{HleDevice, Ios, IosHle};
pub use memory::Memory;
pub use processor::ProcessorInterface;
pub use serial::{SerialInterface, SiDeviceType};
pub use video::VideoInterface;

/// Sizes and console family the machine was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareConfig {
    pub ram_size: u32,
    pub exram_size: Option<u32>,
    pub aram_size: u32,
    pub wii: bool,
}

impl HardwareConfig {
    pub fn gamecube() -> Self {
        Self {
            ram_size: memory::MEM1_SIZE_RETAIL,
            exram_size: None,
            aram_size: dsp::ARAM_SIZE_RETAIL,
            wii: false,
        }
    }

    pub fn wii() -> Self {
        Self {
            ram_size: memory::MEM1_SIZE_RETAIL,
            exram_size: Some(memory::MEM2_SIZE_RETAIL),
            aram_size: dsp::ARAM_SIZE_RETAIL,
            wii: true,
        }
    }
}

/// Every hardware block that takes part in a save state.
#[derive(Debug, Clone)]
pub struct Hardware {
    pub config: HardwareConfig,
    pub memory: Memory,
    pub video: VideoInterface,
    pub serial: SerialInterface,
    pub processor: ProcessorInterface,
    pub dsp: Dsp,
    pub dvd: DvdInterface,
    pub gp_fifo: GpFifo,
    pub expansion: ExpansionInterface,
    pub audio: AudioInterface,
    pub ios: Ios,
}

impl Hardware {
    pub fn new(config: HardwareConfig) -> Self {
        Self {
            config,
            memory: Memory::new(config.ram_size, config.exram_size),
            video: VideoInterface::default(),
            serial: SerialInterface::default(),
            processor: ProcessorInterface::default(),
            dsp: Dsp::new(config.aram_size),
            dvd: DvdInterface::default(),
            gp_fifo: GpFifo::default(),
            expansion: ExpansionInterface::default(),
            audio: AudioInterface::default(),
            ios: Ios::default(),
        }
    }

    pub fn is_wii(&self) -> bool {
        self.config.wii
    }
}

impl StateRoot for Hardware {
    fn do_state(&mut self, p: &mut PointerWrap<'_>) -> StateResult<()> {
        require(self.memory.do_state(p), "Memory")?;
        checkpoint(p, "Memory")?;
        self.video.do_state(p);
        checkpoint(p, "VideoInterface")?;
        self.serial.do_state(p);
        checkpoint(p, "SerialInterface")?;
        self.processor.do_state(p);
        checkpoint(p, "ProcessorInterface")?;
        require(self.dsp.do_state(p), "DSP")?;
        checkpoint(p, "DSP")?;
        self.dvd.do_state(p);
        checkpoint(p, "DVDInterface")?;
        self.gp_fifo.do_state(p);
        checkpoint(p, "GPFifo")?;
        self.expansion.do_state(p);
        checkpoint(p, "ExpansionInterface")?;
        self.audio.do_state(p);
        checkpoint(p, "AudioInterface")?;

        if self.is_wii() {
            self.ios.do_state(p);
            checkpoint(p, "IOS")?;
            require(self.ios.hle.do_state(p), "IOS::HLE")?;
            checkpoint(p, "IOS::HLE")?;
        }

        checkpoint(p, "WIIHW")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::state::{load_state, measure_state, save_state, StateError};

    fn small_config(wii: bool) -> HardwareConfig {
        HardwareConfig { ram_size: 0x100, exram_size: wii.then_some(0x80), aram_size: 0x40, wii }
    }

    #[test]
    fn gamecube_round_trip_restores_every_block() {
        let mut source = Hardware::new(small_config(false));
        source.memory.ram[0x10] = 0x4E;
        source.video.half_line_count = 525;
        source.serial.attach(0, SiDeviceType::GcController);
        source.processor.interrupt_mask = 0xF0;
        source.dsp.aram[3] = 9;
        source.dvd.pending_blocks.push_back(0x8000);
        source.gp_fifo.write_pos = 12;
        source.expansion.channels[1].card_inserted = true;
        source.audio.sample_counter.store(77, Ordering::SeqCst);

        let bytes = save_state(&mut source).expect("save");
        assert_eq!(bytes.len(), measure_state(&mut source).expect("measure"));

        let mut target = Hardware::new(small_config(false));
        load_state(&mut target, &bytes).expect("load");
        assert_eq!(target.memory, source.memory);
        assert_eq!(target.video, source.video);
        assert_eq!(target.serial.channels[0].device.device_type(), SiDeviceType::GcController);
        assert_eq!(target.processor, source.processor);
        assert_eq!(target.dsp, source.dsp);
        assert_eq!(target.dvd, source.dvd);
        assert_eq!(target.gp_fifo, source.gp_fifo);
        assert_eq!(target.expansion, source.expansion);
        assert_eq!(target.audio.sample_counter.load(Ordering::SeqCst), 77);
    }

    #[test]
    fn wii_sections_round_trip() {
        let mut source = Hardware::new(small_config(true));
        source.ios.fds.insert(3, "/dev/es".to_string());
        source.ios.hle.ack_queue.push_back(0x1234);

        let bytes = save_state(&mut source).expect("save");
        let mut target = Hardware::new(small_config(true));
        load_state(&mut target, &bytes).expect("load");
        assert_eq!(target.ios, source.ios);
    }

    #[test]
    fn memory_size_mismatch_fails_without_touching_target() {
        let mut source = Hardware::new(small_config(false));
        let bytes = save_state(&mut source).expect("save");

        let mut config = small_config(false);
        config.ram_size = 0x200;
        let mut target = Hardware::new(config);
        target.memory.ram[0] = 0xAB;

        let err = load_state(&mut target, &bytes).unwrap_err();
        assert_eq!(err, StateError::SubsystemFailed { section: "Memory".into() });
        assert_eq!(target.memory.ram[0], 0xAB);
    }

    #[test]
    fn gamecube_state_does_not_load_on_wii() {
        let mut source = Hardware::new(small_config(false));
        let bytes = save_state(&mut source).expect("save");

        let mut target = Hardware::new(small_config(true));
        assert!(load_state(&mut target, &bytes).is_err());
    }

    #[test]
    fn ios_version_mismatch_is_rejected() {
        let mut source = Hardware::new(small_config(true));
        source.ios.hle.active_version = 36;
        let bytes = save_state(&mut source).expect("save");

        let mut target = Hardware::new(small_config(true));
        let err = load_state(&mut target, &bytes).unwrap_err();
        assert_eq!(err, StateError::SubsystemFailed { section: "IOS::HLE".into() });
    }
}
