/// File name for an exported frame, e.g. `Frame42.jpg`.
///
/// The index is the frame's position in the source, so gaps in the output
/// mark frames that were classified blurry.
pub fn frame_file_name(index: u64, extension: &str) -> String {
    format!("Frame{index}.{extension}")
}
