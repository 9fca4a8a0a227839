//! Chronologically sortable push keys: 8 characters of millisecond timestamp
//! followed by 12 random characters, all drawn from an alphabet whose byte
//! order matches its sort order. Keys generated in the same millisecond
//! increment the random tail so they still sort after the previous key.

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Default)]
pub struct PushIdGenerator {
    last_millis: i64,
    last_random: [u8; 12],
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> String {
        self.next_id_at(chrono::Utc::now().timestamp_millis())
    }

    pub fn next_id_at(&mut self, now_millis: i64) -> String {
        let now = now_millis.max(self.last_millis);
        if now == self.last_millis && self.last_millis != 0 {
            self.increment_random();
        } else {
            let entropy = uuid::Uuid::new_v4();
            for (slot, byte) in self.last_random.iter_mut().zip(entropy.as_bytes()) {
                *slot = byte & 0x3f;
            }
        }
        self.last_millis = now;

        let mut id = String::with_capacity(20);
        let mut stamp = [0u8; 8];
        let mut rest = now;
        for slot in stamp.iter_mut().rev() {
            *slot = PUSH_CHARS[(rest % 64) as usize];
            rest /= 64;
        }
        id.extend(stamp.iter().map(|&b| b as char));
        id.extend(self.last_random.iter().map(|&i| PUSH_CHARS[i as usize] as char));
        id
    }

    fn increment_random(&mut self) {
        for slot in self.last_random.iter_mut().rev() {
            if *slot == 63 {
                *slot = 0;
            } else {
                *slot += 1;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_sort_in_creation_order() {
        let mut generator = PushIdGenerator::new();
        let mut ids = Vec::new();
        for ms in [1_700_000_000_000, 1_700_000_000_000, 1_700_000_000_001, 1_700_000_000_500] {
            ids.push(generator.next_id_at(ms));
        }
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert!(ids.iter().all(|id| id.len() == 20));
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn clock_going_backwards_keeps_order() {
        let mut generator = PushIdGenerator::new();
        let first = generator.next_id_at(2_000);
        let second = generator.next_id_at(1_000);
        assert!(second > first);
    }
}
