//! Fragment parsers.
//!
//! One input format is supported: Google Voice Takeout HTML fragments.
//! The parser implements the [`FragmentParser`](crate::fragment::FragmentParser)
//! trait, so the engine (and tests) can substitute any other source of
//! [`RawFragment`](crate::fragment::RawFragment) values.

mod voice_html;

pub use voice_html::VoiceHtmlParser;
