use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context;
use nightcycle_codec::MonitoringBatch;

/// Loads the monitoring batches of all files, keeping the file order.
pub fn load_monitoring_files<P: AsRef<Path>>(paths: &[P]) -> anyhow::Result<Vec<MonitoringBatch>> {
    let mut batches = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("unable to open {}", path.display()))?;
        let loaded = MonitoringBatch::load_batches(BufReader::new(file))
            .with_context(|| format!("unable to parse {}", path.display()))?;

        debug!("{}: {} monitoring batches", path.display(), loaded.len());
        batches.extend(loaded);
    }

    Ok(batches)
}
