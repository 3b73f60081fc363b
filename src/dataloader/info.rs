use log::info;

use super::dataloader::DataLoader;
use super::dataset::Dataset;

pub fn log_dataset_info<D: Dataset + 'static>(dl: &DataLoader<D>) {
    let total_size = dl.len();
    let config = dl.config();
    let batches = dl.num_batches();
    let dropped = if config.drop_last { total_size % config.batch_size } else { 0 };

    info!("Dataset Information:");
    info!("  Total size: {}", total_size);
    info!("  Batch size: {}", config.batch_size);
    info!("  Batches: {}", batches);
    info!("  Dropped samples: {}", dropped);
    info!("  Workers: {} (prefetch {})", config.num_workers, config.prefetch_count);
    info!("  Shuffle: {}", config.shuffle);
    info!("  Seed: {:?}", config.shuffle_seed);
}
