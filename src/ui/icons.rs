//! Emoji used in user-facing output, with plain-text fallbacks.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!]");

// File indicators
pub static FILE_MOD: Emoji<'_, '_> = Emoji("📝 ", "~");
pub static FILE_SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "-");

// Relay indicators
pub static RUNNING: Emoji<'_, '_> = Emoji("▶️  ", "[>]");
