//! Discovery of the external command-line tools the extractors shell out to.

/// Check if a binary is available in PATH.
pub fn check_binary(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Availability of every external tool used by the default collaborators.
pub fn check_tools() -> Vec<(String, bool)> {
    ["pdfinfo", "pdftotext", "pdftoppm", "tesseract"]
        .iter()
        .map(|tool| (tool.to_string(), check_binary(tool)))
        .collect()
}
