//! jemalloc-backed memory stats.
//!
//! There is no garbage collector: the closest equivalent is returning dirty
//! pages to the OS. `Reclaimer` purges every arena when resident memory
//! crosses a trigger and records how long each purge took. Those purges are
//! what `MemSample` reports as GC runs and pauses, and the trigger is
//! reported as `next_gc_bytes`.
//!
//! The binary installs `tikv_jemallocator::Jemalloc` as the global allocator;
//! without it the numbers only cover jemalloc's own bookkeeping.

use std::ffi::{c_void, CStr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use crate::stats::memory::{MemoryStatsProvider, RuntimeMemStats, PAUSE_BUFFER_LEN};

struct PauseRing {
    pauses: Vec<u64>,
    runs: u32,
    next_trigger: u64,
}

/// Ring buffer of purge pauses shared by the reclaimer and the provider.
pub struct PauseLog {
    ring: Mutex<PauseRing>,
}

impl PauseLog {
    pub fn new(initial_trigger: u64) -> Self {
        Self {
            ring: Mutex::new(PauseRing {
                pauses: vec![0; PAUSE_BUFFER_LEN],
                runs: 0,
                next_trigger: initial_trigger,
            }),
        }
    }

    pub fn record(&self, pause: Duration, next_trigger: u64) {
        let mut ring = self.ring.lock();
        let slot = ring.runs as usize % PAUSE_BUFFER_LEN;
        ring.pauses[slot] = pause.as_nanos().min(u64::MAX as u128) as u64;
        ring.runs = ring.runs.wrapping_add(1);
        ring.next_trigger = next_trigger;
    }

    pub fn next_trigger(&self) -> u64 {
        self.ring.lock().next_trigger
    }

    /// (runs, pause ring, next trigger)
    pub fn snapshot(&self) -> (u32, Vec<u64>, u64) {
        let ring = self.ring.lock();
        (ring.runs, ring.pauses.clone(), ring.next_trigger)
    }
}

pub struct JemallocStatsProvider {
    pauses: Arc<PauseLog>,
}

impl JemallocStatsProvider {
    pub fn new(pauses: Arc<PauseLog>) -> Self {
        Self { pauses }
    }
}

impl MemoryStatsProvider for JemallocStatsProvider {
    fn read(&self) -> RuntimeMemStats {
        refresh_stats();
        let active = read_size(c"stats.active");
        let resident = read_size(c"stats.resident");
        let retained = read_size(c"stats.retained");

        let small_live = read_u64(c"stats.arenas.4096.small.nmalloc")
            .saturating_sub(read_u64(c"stats.arenas.4096.small.ndalloc"));
        let large_live = read_u64(c"stats.arenas.4096.large.nmalloc")
            .saturating_sub(read_u64(c"stats.arenas.4096.large.ndalloc"));

        let (runs, pause_ns, next_trigger) = self.pauses.snapshot();

        RuntimeMemStats {
            heap_objects: small_live + large_live,
            heap_idle: resident.saturating_sub(active),
            heap_in_use: active,
            heap_released: retained,
            next_gc: next_trigger,
            num_gc: runs,
            pause_ns,
        }
    }
}

/// Periodically purges jemalloc arenas once resident memory crosses the trigger.
pub struct Reclaimer {
    pauses: Arc<PauseLog>,
    headroom_bytes: u64,
}

impl Reclaimer {
    pub fn new(pauses: Arc<PauseLog>, headroom_bytes: u64) -> Self {
        Self { pauses, headroom_bytes }
    }

    /// Purges if resident memory reached the trigger. Returns the pause, if any.
    pub fn maybe_purge(&self) -> Option<Duration> {
        refresh_stats();
        let resident = read_size(c"stats.resident");
        if resident < self.pauses.next_trigger() {
            return None;
        }
        Some(self.purge())
    }

    pub fn purge(&self) -> Duration {
        let start = Instant::now();
        // SAFETY: "arena.<i>.purge" takes no input or output; 4096 is
        // MALLCTL_ARENAS_ALL.
        unsafe {
            tikv_jemalloc_sys::mallctl(
                c"arena.4096.purge".as_ptr(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                0,
            );
        }
        let pause = start.elapsed();

        refresh_stats();
        let next_trigger = read_size(c"stats.resident").saturating_add(self.headroom_bytes);
        self.pauses.record(pause, next_trigger);
        tracing::debug!("[Reclaimer] purged arenas in {:?}, next purge at {} bytes", pause, next_trigger);
        pause
    }

    pub fn spawn(self, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await; // Skip first immediate tick
            loop {
                interval.tick().await;
                self.maybe_purge();
            }
        })
    }
}

/// Stats are cached by jemalloc until the epoch is bumped.
fn refresh_stats() {
    let mut epoch: u64 = 1;
    let mut len = std::mem::size_of::<u64>();
    // SAFETY: "epoch" reads and writes a u64; both pointers reference `epoch`
    // and the lengths match its size.
    unsafe {
        tikv_jemalloc_sys::mallctl(
            c"epoch".as_ptr(),
            &mut epoch as *mut u64 as *mut c_void,
            &mut len,
            &mut epoch as *mut u64 as *mut c_void,
            std::mem::size_of::<u64>(),
        );
    }
}

fn read_size(name: &CStr) -> u64 {
    let mut value: usize = 0;
    let mut len = std::mem::size_of::<usize>();
    // SAFETY: `name` is a size_t statistic; `value` and `len` describe a
    // buffer of exactly that size.
    let rc = unsafe {
        tikv_jemalloc_sys::mallctl(
            name.as_ptr(),
            &mut value as *mut usize as *mut c_void,
            &mut len,
            std::ptr::null_mut(),
            0,
        )
    };
    if rc != 0 {
        return 0;
    }
    value as u64
}

fn read_u64(name: &CStr) -> u64 {
    let mut value: u64 = 0;
    let mut len = std::mem::size_of::<u64>();
    // SAFETY: `name` is a uint64_t statistic; `value` and `len` describe a
    // buffer of exactly that size.
    let rc = unsafe {
        tikv_jemalloc_sys::mallctl(
            name.as_ptr(),
            &mut value as *mut u64 as *mut c_void,
            &mut len,
            std::ptr::null_mut(),
            0,
        )
    };
    if rc != 0 {
        return 0;
    }
    value
}
