use std::sync::Mutex;

/// Mints local comment ids from the current time: `"{ms}"`, or `"{ms}-{n}"`
/// for the n-th extra id handed out within the same millisecond.
#[derive(Debug, Default)]
pub struct CommentIdGenerator {
    last: Mutex<(i64, u32)>,
}

impl CommentIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, now_ms: i64) -> String {
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if now_ms == last.0 {
            last.1 += 1;
            format!("{now_ms}-{}", last.1)
        } else {
            *last = (now_ms, 0);
            now_ms.to_string()
        }
    }
}
