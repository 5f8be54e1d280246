/// Configuration for blob operations
#[derive(Debug, Clone)]
pub struct BlobConfig {
    /// Absolute max size allowed for a single blob (safety guard)
    pub max_blob_bytes: u64,

    /// Rules for part-based uploads
    pub upload_rules: UploadRules,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            max_blob_bytes: 512 * 1024 * 1024, // 512MB
            upload_rules: UploadRules::default(),
        }
    }
}

/// Rules for multipart uploads
#[derive(Debug, Clone)]
pub struct UploadRules {
    /// Part size (bytes). Also the most a store buffers for one upload.
    pub part_size: u64,

    /// Upper bound on the number of parts of one upload
    pub max_parts: u32,
}

/// S3 and R2 reject non-final parts below 5MiB
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

impl Default for UploadRules {
    fn default() -> Self {
        Self {
            part_size: 8 * 1024 * 1024, // 8MB
            max_parts: 10_000,
        }
    }
}

impl BlobConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max blob size
    pub fn with_max_blob_bytes(mut self, bytes: u64) -> Self {
        self.max_blob_bytes = bytes;
        self
    }

    /// Set upload rules
    pub fn with_upload_rules(mut self, rules: UploadRules) -> Self {
        self.upload_rules = rules;
        self
    }
}

impl UploadRules {
    /// Create new upload rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Set part size, raised to the S3 minimum when smaller
    pub fn with_part_size(mut self, bytes: u64) -> Self {
        self.part_size = bytes.max(MIN_PART_SIZE);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_size_never_drops_below_s3_minimum() {
        let rules = UploadRules::new().with_part_size(1024);
        assert_eq!(rules.part_size, MIN_PART_SIZE);

        let rules = UploadRules::new().with_part_size(16 * 1024 * 1024);
        assert_eq!(rules.part_size, 16 * 1024 * 1024);
    }
}
