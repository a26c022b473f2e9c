use log::debug;

use super::{Header, PatchRoot};

impl PatchRoot {
    /// Build the patch to apply from the current selection.
    ///
    /// Keeps applied headers that are special or have an applied hunk, and
    /// their applied hunks, in document order. Skipping or trimming a hunk
    /// changes the length of the new file from that point on, so the new-file
    /// start of every later hunk of the same file is shifted to match.
    pub fn filter(&self) -> PatchRoot {
        let mut headers = Vec::new();
        for header in &self.headers {
            let included = header.applied
                && (header.is_special() || header.hunks.iter().any(|hunk| hunk.applied));
            if !included {
                debug!("skipping {}", header.filename());
                continue;
            }

            let mut kept = Header {
                hunks: Vec::new(),
                ..header.clone()
            };
            let mut fix_offset: i64 = 0;
            for hunk in &header.hunks {
                if hunk.applied {
                    let mut hunk = hunk.clone();
                    if fix_offset != 0 {
                        let shifted = i64::from(hunk.to_line) + fix_offset;
                        hunk.to_line = u32::try_from(shifted.max(0)).unwrap_or(u32::MAX);
                        debug!(
                            "{}: hunk at -{} moves by {fix_offset} to +{}",
                            header.filename(),
                            hunk.from_line,
                            hunk.to_line
                        );
                    }
                    kept.hunks.push(hunk);
                }
                fix_offset += hunk.offset_shift();
            }
            headers.push(kept);
        }
        PatchRoot::new(headers)
    }
}
