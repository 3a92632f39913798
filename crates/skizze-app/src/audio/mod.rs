pub mod output;
pub mod synth;

pub use output::AudioOutput;
pub use synth::Oscillator;
