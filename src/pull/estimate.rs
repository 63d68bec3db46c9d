/// One observation handed to the display layer after every committed chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    pub offset: u64,
    pub total_records: u64,
    pub bytes_downloaded: u64,
    pub estimated_total_bytes: u64,
    pub retries: usize,
}

impl ProgressUpdate {
    pub fn new(offset: u64, total_records: u64, bytes_downloaded: u64, retries: usize) -> Self {
        let estimate = estimate(offset, total_records, bytes_downloaded);
        Self {
            offset,
            total_records: estimate.total_records,
            bytes_downloaded,
            estimated_total_bytes: estimate.estimated_total_bytes,
            retries,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub avg_bytes_per_record: f64,
    /// Never below `offset`: a dataset larger than its count is still growing
    /// the denominator.
    pub total_records: u64,
    pub estimated_total_bytes: u64,
}

/// Extrapolates the final output size from the running bytes-per-record average.
pub fn estimate(offset: u64, total_records: u64, bytes_downloaded: u64) -> Estimate {
    let total_records = total_records.max(offset);
    if offset == 0 {
        return Estimate {
            avg_bytes_per_record: 0.0,
            total_records,
            estimated_total_bytes: bytes_downloaded,
        };
    }

    let avg_bytes_per_record = bytes_downloaded as f64 / offset as f64;
    let estimated_total_bytes = (avg_bytes_per_record * total_records as f64).round() as u64;
    Estimate {
        avg_bytes_per_record,
        total_records,
        estimated_total_bytes: estimated_total_bytes.max(bytes_downloaded),
    }
}

/// Seconds left at the rate observed during this run, if any rate was observed.
pub fn eta_seconds(records_this_run: u64, elapsed_secs: f64, remaining_records: u64) -> Option<u64> {
    if remaining_records == 0 {
        return Some(0);
    }
    if records_this_run == 0 || elapsed_secs <= 0.0 {
        return None;
    }
    let rate = records_this_run as f64 / elapsed_secs;
    Some((remaining_records as f64 / rate).ceil() as u64)
}
