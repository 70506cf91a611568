/// Class order of the bundled ASL alphabet model.
pub const ASL_LABELS: [&str; 27] = [
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "NOTHING", "O", "P",
    "Q", "R", "S", "T", "U", "V", "W", "X", "Y", "Z",
];

/// Emitted when the hand is absent; not a sign.
pub const NOTHING_LABEL: &str = "NOTHING";
pub const UNKNOWN_LABEL: &str = "Unknown";

pub fn label_for(index: usize) -> &'static str {
    ASL_LABELS.get(index).copied().unwrap_or(UNKNOWN_LABEL)
}

pub fn is_sign(label: &str) -> bool {
    label != NOTHING_LABEL && label != UNKNOWN_LABEL
}
