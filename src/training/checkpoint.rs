//! Per-epoch checkpoint retention
//!
//! Decides, after every completed epoch, whether that epoch's model is written
//! and which earlier checkpoint files are removed.

use std::path::PathBuf;

use burn::tensor::backend::Backend;
use tracing::{debug, info};

use crate::model::{save_classifier, ResNet, RetentionPolicy};
use crate::utils::error::{GrowthStageError, Result};

/// A checkpoint currently on disk
#[derive(Debug, Clone, PartialEq)]
pub struct SavedCheckpoint {
    /// 1-based epoch the checkpoint was taken after
    pub epoch: usize,
    /// Mean training loss of that epoch
    pub loss: f64,
    pub path: PathBuf,
}

/// What to do with the checkpoint of a finished epoch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetentionDecision {
    /// Write this epoch's checkpoint
    pub save: bool,
    /// Previously written checkpoints to delete
    pub remove: Vec<SavedCheckpoint>,
}

/// Tracks written checkpoints and applies a [`RetentionPolicy`]
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    policy: RetentionPolicy,
    saved: Vec<SavedCheckpoint>,
}

impl CheckpointManager {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            policy,
            saved: Vec::new(),
        }
    }

    /// Checkpoints still on disk, oldest first
    pub fn saved(&self) -> &[SavedCheckpoint] {
        &self.saved
    }

    /// Decide what happens to a new checkpoint without touching the disk
    pub fn plan(&self, loss: f64) -> RetentionDecision {
        match self.policy {
            RetentionPolicy::KeepAll => RetentionDecision {
                save: true,
                remove: Vec::new(),
            },
            RetentionPolicy::KeepLast(n) => {
                let excess = (self.saved.len() + 1).saturating_sub(n);
                RetentionDecision {
                    save: true,
                    remove: self.saved.iter().take(excess).cloned().collect(),
                }
            }
            RetentionPolicy::KeepBest => {
                let is_best = self.saved.iter().all(|c| loss < c.loss);
                if is_best {
                    RetentionDecision {
                        save: true,
                        remove: self.saved.clone(),
                    }
                } else {
                    RetentionDecision::default()
                }
            }
        }
    }

    /// Apply the policy for a finished epoch: write and prune as decided
    pub fn commit<B: Backend>(
        &mut self,
        model: &ResNet<B>,
        epoch: usize,
        loss: f64,
        path: PathBuf,
    ) -> Result<RetentionDecision> {
        let decision = self.plan(loss);

        if decision.save {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            save_classifier(model, &path)?;
            info!("Checkpoint saved: {:?}", path);
        } else {
            debug!(
                "Epoch {} loss {:.4} did not improve, checkpoint skipped",
                epoch, loss
            );
        }

        for old in &decision.remove {
            if old.path.exists() {
                std::fs::remove_file(&old.path).map_err(|e| {
                    GrowthStageError::Checkpoint(format!("Failed to remove {:?}: {}", old.path, e))
                })?;
            }
            debug!("Removed checkpoint from epoch {}", old.epoch);
        }

        self.saved.retain(|c| !decision.remove.contains(c));
        if decision.save {
            self.saved.push(SavedCheckpoint { epoch, loss, path });
        }

        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    fn checkpoint(epoch: usize, loss: f64) -> SavedCheckpoint {
        SavedCheckpoint {
            epoch,
            loss,
            path: PathBuf::from(format!("growth_stage_epoch{}.mpk", epoch)),
        }
    }

    #[test]
    fn test_keep_all_never_removes() {
        let mut manager = CheckpointManager::new(RetentionPolicy::KeepAll);
        manager.saved = vec![checkpoint(1, 0.9), checkpoint(2, 0.8)];

        let decision = manager.plan(1.5);
        assert!(decision.save);
        assert!(decision.remove.is_empty());
    }

    #[test]
    fn test_keep_last_drops_oldest() {
        let mut manager = CheckpointManager::new(RetentionPolicy::KeepLast(2));
        assert!(manager.plan(1.0).remove.is_empty());

        manager.saved = vec![checkpoint(1, 0.9)];
        assert!(manager.plan(0.8).remove.is_empty());

        manager.saved = vec![checkpoint(1, 0.9), checkpoint(2, 0.8)];
        let decision = manager.plan(0.7);
        assert!(decision.save);
        assert_eq!(decision.remove, vec![checkpoint(1, 0.9)]);
    }

    #[test]
    fn test_keep_best_tracks_lowest_loss() {
        let mut manager = CheckpointManager::new(RetentionPolicy::KeepBest);
        assert!(manager.plan(1.0).save);

        manager.saved = vec![checkpoint(1, 0.5)];
        assert_eq!(manager.plan(0.6), RetentionDecision::default());

        let decision = manager.plan(0.4);
        assert!(decision.save);
        assert_eq!(decision.remove, vec![checkpoint(1, 0.5)]);
    }

    #[test]
    fn test_commit_writes_and_prunes_files() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let model: ResNet<NdArray> = ResNet::new(2, &device);
        let mut manager = CheckpointManager::new(RetentionPolicy::KeepLast(1));

        let first = dir.path().join("growth_stage_epoch1.mpk");
        let second = dir.path().join("growth_stage_epoch2.mpk");

        manager.commit(&model, 1, 0.9, first.clone()).unwrap();
        assert!(first.exists());

        manager.commit(&model, 2, 0.7, second.clone()).unwrap();
        assert!(!first.exists());
        assert!(second.exists());
        assert_eq!(manager.saved().len(), 1);
        assert_eq!(manager.saved()[0].epoch, 2);
    }
}
