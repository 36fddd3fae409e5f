//! Logging.
//!
//! Records are produced with the [`tlog!`](crate::tlog) macro and written
//! to stderr by [`Drain`]. The maximum level is a compile time constant
//! (see `slog` features in Cargo.toml), the runtime level is managed by
//! [`set_log_level`].

use std::io::Write as _;
use std::sync::atomic::{AtomicUsize, Ordering};

// slog::Level::Info
const DEFAULT_LOG_LEVEL: usize = 4;

static LOG_LEVEL: AtomicUsize = AtomicUsize::new(DEFAULT_LOG_LEVEL);

pub fn set_log_level(lvl: slog::Level) {
    LOG_LEVEL.store(lvl.as_usize(), Ordering::Relaxed);
}

#[must_use]
pub fn log_level() -> slog::Level {
    slog::Level::from_usize(LOG_LEVEL.load(Ordering::Relaxed)).unwrap_or(slog::Level::Info)
}

pub struct Drain;

#[must_use]
pub fn root() -> slog::Logger {
    slog::Logger::root(Drain, slog::o!())
}

#[macro_export]
macro_rules! tlog {
    ($lvl:ident, $($args:tt)*) => {{
        let logger = $crate::log::root();
        slog::slog_log!(logger, slog::Level::$lvl, "", $($args)*);
    }}
}

impl slog::Drain for Drain {
    type Ok = ();
    type Err = slog::Never;

    fn log(
        &self,
        record: &slog::Record,
        values: &slog::OwnedKVList,
    ) -> Result<Self::Ok, Self::Err> {
        if !record.level().is_at_least(log_level()) {
            return Ok(());
        }

        let mut s = StrSerializer {
            str: format!("{}", record.msg()),
        };
        {
            use slog::KV;
            // StrSerializer never fails.
            let _ = record.kv().serialize(record, &mut s);
            let _ = values.serialize(record, &mut s);
        }

        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "{} {}:{}: {}",
            record.level().as_short_str(),
            record.file(),
            record.line(),
            s.str
        );
        Ok(())
    }
}

struct StrSerializer {
    pub str: String,
}

impl slog::Serializer for StrSerializer {
    fn emit_arguments(&mut self, key: slog::Key, val: &std::fmt::Arguments) -> slog::Result {
        use std::fmt::Write;
        write!(&mut self.str, ", {key}: {val}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn serializer_appends_key_values() {
        let mut s = StrSerializer {
            str: String::from("normalized"),
        };
        slog::Serializer::emit_arguments(&mut s, "sets", &format_args!("{}", 3)).unwrap();
        slog::Serializer::emit_arguments(&mut s, "columns", &format_args!("{}", "a, b")).unwrap();
        assert_eq!(s.str, "normalized, sets: 3, columns: a, b");
    }

    #[test]
    fn level_roundtrip() {
        set_log_level(slog::Level::Debug);
        assert_eq!(log_level(), slog::Level::Debug);
        set_log_level(slog::Level::Info);
        assert_eq!(log_level(), slog::Level::Info);
    }
}
