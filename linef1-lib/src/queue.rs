//! State shared between the background reader and client threads: the four
//! measurement queues and the acknowledgment signal.
//!
//! The reader is the only producer for both. Queues are unbounded FIFOs
//! guarded by a single mutex so that a flush empties all of them in one step.

use crate::data::{Distance, Measurement, Meteo, Velocity};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use strum_macros::Display;

/// Selects one of the measurement queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Stream {
    #[strum(to_string = "distance")]
    Distance,
    #[strum(to_string = "velocity")]
    Velocity,
    #[strum(to_string = "meteo (air)")]
    MeteoAir,
    #[strum(to_string = "meteo (material)")]
    MeteoMaterial,
}

#[derive(Debug, Default)]
struct Buffers {
    distance: VecDeque<Distance>,
    velocity: VecDeque<Velocity>,
    meteo_air: VecDeque<Meteo>,
    meteo_mat: VecDeque<Meteo>,
}

impl Buffers {
    fn pop(&mut self, stream: Stream) -> Option<Measurement> {
        match stream {
            Stream::Distance => self.distance.pop_front().map(Measurement::Distance),
            Stream::Velocity => self.velocity.pop_front().map(Measurement::Velocity),
            Stream::MeteoAir => self.meteo_air.pop_front().map(Measurement::Meteo),
            Stream::MeteoMaterial => self.meteo_mat.pop_front().map(Measurement::Meteo),
        }
    }

    fn len(&self, stream: Stream) -> usize {
        match stream {
            Stream::Distance => self.distance.len(),
            Stream::Velocity => self.velocity.len(),
            Stream::MeteoAir => self.meteo_air.len(),
            Stream::MeteoMaterial => self.meteo_mat.len(),
        }
    }
}

/// The distance, velocity, meteo-air and meteo-material queues.
#[derive(Debug, Default)]
pub struct MeasurementQueues {
    buffers: Mutex<Buffers>,
    available: Condvar,
}

impl MeasurementQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to its queue. Meteo records are routed by sensor id.
    pub fn push(&self, measurement: Measurement) -> Stream {
        let mut buffers = self.buffers.lock();
        let stream = match measurement {
            Measurement::Distance(d) => {
                buffers.distance.push_back(d);
                Stream::Distance
            }
            Measurement::Velocity(v) => {
                buffers.velocity.push_back(v);
                Stream::Velocity
            }
            Measurement::Meteo(m) if m.is_air() => {
                buffers.meteo_air.push_back(m);
                Stream::MeteoAir
            }
            Measurement::Meteo(m) => {
                buffers.meteo_mat.push_back(m);
                Stream::MeteoMaterial
            }
        };
        drop(buffers);
        // Waiters on different queues share the condvar
        self.available.notify_all();
        stream
    }

    /// Pop the oldest record of `stream`, waiting up to `timeout` for one to arrive.
    pub fn pop_timeout(&self, stream: Stream, timeout: Duration) -> Option<Measurement> {
        self.wait_pop(timeout, |buffers| buffers.pop(stream))
    }

    pub fn pop_distance(&self, timeout: Duration) -> Option<Distance> {
        self.wait_pop(timeout, |buffers| buffers.distance.pop_front())
    }

    pub fn pop_velocity(&self, timeout: Duration) -> Option<Velocity> {
        self.wait_pop(timeout, |buffers| buffers.velocity.pop_front())
    }

    pub fn pop_meteo_air(&self, timeout: Duration) -> Option<Meteo> {
        self.wait_pop(timeout, |buffers| buffers.meteo_air.pop_front())
    }

    pub fn pop_meteo_mat(&self, timeout: Duration) -> Option<Meteo> {
        self.wait_pop(timeout, |buffers| buffers.meteo_mat.pop_front())
    }

    fn wait_pop<T>(&self, timeout: Duration, mut take: impl FnMut(&mut Buffers) -> Option<T>) -> Option<T> {
        // None when the timeout is too large to represent: wait without one
        let deadline = Instant::now().checked_add(timeout);
        let mut buffers = self.buffers.lock();
        loop {
            if let Some(item) = take(&mut buffers) {
                return Some(item);
            }
            match deadline {
                Some(deadline) => {
                    if self.available.wait_until(&mut buffers, deadline).timed_out() {
                        return take(&mut buffers);
                    }
                }
                None => self.available.wait(&mut buffers),
            }
        }
    }

    /// Empty all four queues at once.
    pub fn flush(&self) -> usize {
        let mut buffers = self.buffers.lock();
        let dropped = buffers.distance.len()
            + buffers.velocity.len()
            + buffers.meteo_air.len()
            + buffers.meteo_mat.len();
        buffers.distance.clear();
        buffers.velocity.clear();
        buffers.meteo_air.clear();
        buffers.meteo_mat.clear();
        dropped
    }

    pub fn len(&self, stream: Stream) -> usize {
        self.buffers.lock().len(stream)
    }

    pub fn is_empty(&self) -> bool {
        let buffers = self.buffers.lock();
        buffers.distance.is_empty()
            && buffers.velocity.is_empty()
            && buffers.meteo_air.is_empty()
            && buffers.meteo_mat.is_empty()
    }
}

/// Acknowledgment event, set by the reader on any command echo.
///
/// It does not record which command was acknowledged; the engine allows a
/// single command in flight at a time.
#[derive(Debug, Default)]
pub struct AckSignal {
    acked: Mutex<bool>,
    changed: Condvar,
}

impl AckSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        *self.acked.lock() = true;
        self.changed.notify_all();
    }

    pub fn clear(&self) {
        *self.acked.lock() = false;
    }

    /// Wait until the signal is set. Returns false on timeout.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut acked = self.acked.lock();
        while !*acked {
            match deadline {
                Some(deadline) => {
                    if self.changed.wait_until(&mut acked, deadline).timed_out() {
                        break;
                    }
                }
                None => self.changed.wait(&mut acked),
            }
        }
        *acked
    }
}
