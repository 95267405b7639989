use crate::classifier::Classifier;
use crate::config::{IngestConfig, MoverType, Result, TransferConfig};
use crate::hasher::Xxh3Hasher;
use crate::mover::{DryRunMover, LocalMover, Mover, NativeCopyMover, RsyncMover};
use crate::notify::{CommandNotifier, LibraryRefresher, OutcomeObserver};

pub fn build_mover(config: &TransferConfig) -> Box<dyn Mover> {
    let copier: Box<dyn Mover> = match config.mover {
        MoverType::DryRun => return Box::new(DryRunMover),
        MoverType::Rsync => Box::new(RsyncMover::new(
            config.extra_args.clone(),
            config.timeout(),
            Box::new(Xxh3Hasher::new()),
        )),
        MoverType::Native => Box::new(NativeCopyMover::new(Box::new(Xxh3Hasher::new()))),
    };

    Box::new(LocalMover::new(copier, Box::new(Xxh3Hasher::new())))
}

pub fn build_classifier(config: &IngestConfig) -> Result<Classifier> {
    Ok(Classifier::new(
        config.tag_blacklist()?,
        config.media_extensions.clone(),
    ))
}

pub fn build_observers(config: &IngestConfig) -> Vec<Box<dyn OutcomeObserver>> {
    let mut observers: Vec<Box<dyn OutcomeObserver>> = Vec::new();

    if let Some(refresh) = &config.library_refresh {
        observers.push(Box::new(LibraryRefresher::from_config(refresh)));
    }

    if let Some(notify) = &config.notify
        && let Some(notifier) = CommandNotifier::new(&notify.command)
    {
        observers.push(Box::new(notifier));
    }

    observers
}
