//! Voice command handling
//!
//! Not an NLU system: a substring decision table over the lowercased
//! transcript produces an intent, an optional hub action and a canned
//! response. Synthesis of the spoken reply is a black-box service behind
//! [`speech::SpeechSynthesizer`], with a local fallback when the remote
//! endpoint is unconfigured or failing.

pub mod interpreter;
pub mod service;
pub mod speech;

pub use interpreter::{detect_intent, interpret, Intent, Interpretation, VoiceAction};
pub use service::{VoiceOutcome, VoiceService};
pub use speech::{from_config as synthesizer_from_config, HttpSpeech, LocalSpeech, SpeechSynthesizer};
