use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::state::{DoState, PointerWrap};

/// Audio interface registers. The sample counter and the interrupt flag are
/// also touched by the mixer thread.
#[derive(Debug, Default)]
pub struct AudioInterface {
    pub control: u32,
    pub volume: u32,
    pub interrupt_timing: u32,
    pub aid_sample_rate: u32,
    pub ais_sample_rate: u32,
    pub cpu_cycles_per_sample: u64,
    pub sample_counter: AtomicU32,
    pub interrupt_pending: AtomicBool,
}

impl Clone for AudioInterface {
    fn clone(&self) -> Self {
        Self {
            control: self.control,
            volume: self.volume,
            interrupt_timing: self.interrupt_timing,
            aid_sample_rate: self.aid_sample_rate,
            ais_sample_rate: self.ais_sample_rate,
            cpu_cycles_per_sample: self.cpu_cycles_per_sample,
            sample_counter: AtomicU32::new(self.sample_counter.load(Ordering::SeqCst)),
            interrupt_pending: AtomicBool::new(self.interrupt_pending.load(Ordering::SeqCst)),
        }
    }
}

impl AudioInterface {
    pub fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        self.control.do_state(p);
        self.volume.do_state(p);
        self.interrupt_timing.do_state(p);
        self.aid_sample_rate.do_state(p);
        self.ais_sample_rate.do_state(p);
        self.cpu_cycles_per_sample.do_state(p);
        p.do_atomic_u32(&self.sample_counter);
        p.do_flag(&self.interrupt_pending);
    }
}
