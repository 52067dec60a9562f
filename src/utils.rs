/// Payloads at or below this many bytes are treated as failed downloads
pub const MIN_FILE_SIZE: usize = 1024;

const ILLEGAL_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47];

/// Replace characters that are illegal in file names with `_`
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if ILLEGAL_CHARS.contains(&c) { '_' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// True for a JPEG or PNG payload larger than `min_size`
pub fn is_valid_image(data: &[u8], min_size: usize) -> bool {
    data.len() > min_size && (data.starts_with(JPEG_MAGIC) || data.starts_with(PNG_MAGIC))
}

pub fn percent(done: usize, total: usize) -> usize {
    if total == 0 {
        return 100;
    }
    done * 100 / total
}
