use super::types::FilePart;

/// Split a file into fixed-size parts with 1-based sequence numbers. A file
/// that fits in one chunk (including an empty file) becomes a single
/// whole-file part.
pub fn plan_parts(file_name: &str, size: u64, chunk_size: usize) -> Vec<FilePart> {
    let chunk = chunk_size.max(1) as u64;
    let total = size.div_ceil(chunk).max(1) as u32;

    (1..=total)
        .map(|part_no| {
            let offset = (part_no as u64 - 1) * chunk;
            let len = (size - offset).min(chunk) as usize;
            FilePart {
                part_no,
                offset,
                len,
                part_name: part_name(file_name, part_no, total),
            }
        })
        .collect()
}

/// Deterministic destination name for one part. A single-part file keeps the
/// bare file name; multi-part files get a zero-padded sequence suffix so
/// ordering stays unambiguous at the destination.
pub fn part_name(file_name: &str, part_no: u32, total_parts: u32) -> String {
    if total_parts <= 1 {
        file_name.to_string()
    } else {
        format!("{}.{:04}", file_name, part_no)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_multiple_split() {
        let parts = plan_parts("data.bin", 400, 100);
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0].part_no, 1);
        assert_eq!(parts[0].offset, 0);
        assert_eq!(parts[3].offset, 300);
        assert!(parts.iter().all(|p| p.len == 100));
    }

    #[test]
    fn test_remainder_lands_in_last_part() {
        let parts = plan_parts("data.bin", 250, 100);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2].len, 50);
        assert_eq!(parts[2].offset, 200);
    }

    #[test]
    fn test_single_part_keeps_file_name() {
        let parts = plan_parts("photo.jpg", 50, 100);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].part_name, "photo.jpg");
        assert_eq!(parts[0].len, 50);
    }

    #[test]
    fn test_empty_file_is_one_empty_part() {
        let parts = plan_parts("empty.txt", 0, 100);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].len, 0);
        assert_eq!(parts[0].part_name, "empty.txt");
    }

    #[test]
    fn test_multi_part_names_are_zero_padded() {
        let parts = plan_parts("video.mp4", 1000, 100);
        assert_eq!(parts[0].part_name, "video.mp4.0001");
        assert_eq!(parts[9].part_name, "video.mp4.0010");
    }

    #[test]
    fn test_parts_cover_the_file_exactly() {
        let parts = plan_parts("data.bin", 12345, 1000);
        let covered: u64 = parts.iter().map(|p| p.len as u64).sum();
        assert_eq!(covered, 12345);
        for pair in parts.windows(2) {
            assert_eq!(pair[0].offset + pair[0].len as u64, pair[1].offset);
        }
    }
}
