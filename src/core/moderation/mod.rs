// Core moderation module - the content filter pipeline business logic.
// Detectors are pure values built from config rows; the service owns the
// policy storage port and the automated side effects.

pub mod filter_models;
pub mod filter_pipeline;
pub mod hate_speech_detector;
pub mod moderation_service;
pub mod profanity_detector;
pub mod spam_detector;

pub use filter_models::*;
pub use filter_pipeline::*;
pub use hate_speech_detector::*;
pub use moderation_service::*;
pub use profanity_detector::*;
pub use spam_detector::*;
