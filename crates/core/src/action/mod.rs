use serde::{Deserialize, Serialize};

/// Action code understood by visualisation plugins, forwarded verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisAction {
    None,
    NextPreset,
    PrevPreset,
    LockPreset,
    RandomPreset,
    RatePresetPlus,
    RatePresetMinus,
    /// Payload carries the album-art path, empty when there is none.
    UpdateAlbumArt,
}

/// User action as raised by the host's input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostAction {
    PresetNext,
    PresetPrev,
    PresetLock,
    PresetRandom,
    RatePresetPlus,
    RatePresetMinus,
    /// Any action the visualisation has no mapping for.
    Other(u16),
}

impl From<HostAction> for VisAction {
    fn from(action: HostAction) -> Self {
        match action {
            HostAction::PresetNext => VisAction::NextPreset,
            HostAction::PresetPrev => VisAction::PrevPreset,
            HostAction::PresetLock => VisAction::LockPreset,
            HostAction::PresetRandom => VisAction::RandomPreset,
            HostAction::RatePresetPlus => VisAction::RatePresetPlus,
            HostAction::RatePresetMinus => VisAction::RatePresetMinus,
            HostAction::Other(_) => VisAction::None,
        }
    }
}
