// Commands - Control thread → audio thread

use crate::sound::asset::SoundAsset;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum AudioCommand {
    /// Start a click on this output sample
    ScheduleClick { at_sample: u64, accented: bool },
    /// Replace tick and tock together
    SetSoundAsset(Arc<SoundAsset>),
}
