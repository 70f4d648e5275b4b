//! Chronologically ordered record keys.
//!
//! A push id is 20 characters: 8 characters encoding the millisecond
//! timestamp followed by 12 random characters. The alphabet is in ASCII
//! order, so lexicographic order of ids equals creation order. Ids minted in
//! the same millisecond reuse the previous random suffix incremented by one,
//! which keeps them ordered and unique.

use chrono::Utc;
use parking_lot::Mutex;
use rand::Rng;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIMESTAMP_LEN: usize = 8;
const RANDOM_LEN: usize = 12;

struct PushState {
    last_time: i64,
    last_random: [u8; RANDOM_LEN],
}

/// Generator for push ids. One instance per store.
pub struct PushIdGenerator {
    state: Mutex<PushState>,
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PushState {
                last_time: i64::MIN,
                last_random: [0; RANDOM_LEN],
            }),
        }
    }

    /// Mint the next id using the current wall clock.
    pub fn next_id(&self) -> String {
        self.next_id_at(Utc::now().timestamp_millis())
    }

    fn next_id_at(&self, now_ms: i64) -> String {
        let mut state = self.state.lock();

        // Never step backwards, even if the wall clock does.
        let mut now = now_ms.max(state.last_time);

        if now == state.last_time {
            if !increment(&mut state.last_random) {
                // Suffix space for this millisecond is exhausted.
                now += 1;
                randomize(&mut state.last_random);
            }
        } else {
            randomize(&mut state.last_random);
        }
        state.last_time = now;

        let mut id = String::with_capacity(TIMESTAMP_LEN + RANDOM_LEN);
        id.push_str(&encode_timestamp(now));
        id.extend(
            state
                .last_random
                .iter()
                .map(|&idx| PUSH_CHARS[idx as usize] as char),
        );
        id
    }
}

impl Default for PushIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_timestamp(mut ms: i64) -> String {
    let mut chars = [b'-'; TIMESTAMP_LEN];
    for slot in chars.iter_mut().rev() {
        *slot = PUSH_CHARS[ms.rem_euclid(64) as usize];
        ms = ms.div_euclid(64);
    }
    chars.iter().map(|&c| c as char).collect()
}

fn randomize(digits: &mut [u8; RANDOM_LEN]) {
    let mut rng = rand::thread_rng();
    for digit in digits.iter_mut() {
        *digit = rng.gen_range(0..64);
    }
}

/// Add one to a base-64 number stored most-significant first.
/// Returns false on overflow.
fn increment(digits: &mut [u8; RANDOM_LEN]) -> bool {
    for digit in digits.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return true;
        }
    }
    false
}
