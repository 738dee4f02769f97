use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use crate::config::Config;
use crate::dashboard_fetch::{
    fetch_accuracy, fetch_cooccurrence, fetch_latest_prediction, fetch_stats_summary,
};
use crate::http_client::Transport;
use crate::pagination::{PAGE_SIZE, fetch_page};
use crate::refresh::{RefreshPolicy, run_refresh};
use crate::state::{Delta, FetchTag, ProviderCommand};

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub fetch_parallelism: usize,
    pub page_size: u32,
    pub refresh: RefreshPolicy,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            fetch_parallelism: 5,
            page_size: PAGE_SIZE,
            refresh: RefreshPolicy::default(),
        }
    }
}

impl From<&Config> for ProviderSettings {
    fn from(config: &Config) -> Self {
        Self {
            fetch_parallelism: config.fetch_parallelism,
            page_size: PAGE_SIZE,
            refresh: config.refresh,
        }
    }
}

pub fn spawn_provider(
    api: Arc<dyn Transport>,
    settings: ProviderSettings,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let pool = build_fetch_pool(settings.fetch_parallelism);
        if pool.is_none() {
            let _ = tx.send(Delta::Log(
                "[WARN] Fetch pool unavailable; loading on the provider thread".to_string(),
            ));
        }

        for cmd in cmd_rx {
            match cmd {
                ProviderCommand::LoadAll { tag } => {
                    run_fetch_group(&pool, api.as_ref(), &tag, settings.page_size, &tx);
                }
                ProviderCommand::FetchHistoryPage { tag, page } => {
                    let result = fetch_page(api.as_ref(), &tag.variant, page, settings.page_size)
                        .map_err(|err| format!("{err:#}"));
                    let _ = tx.send(Delta::SetHistoryPage { tag, page, result });
                }
                ProviderCommand::Refresh { tag } => {
                    // Polling sleeps; keep it off the command loop so page
                    // requests and loads still get served.
                    let api = Arc::clone(&api);
                    let tx = tx.clone();
                    let policy = settings.refresh;
                    thread::spawn(move || {
                        let progress_tx = tx.clone();
                        let progress_tag = tag.clone();
                        let outcome = run_refresh(
                            api.as_ref(),
                            &tag.variant,
                            &policy,
                            thread::sleep,
                            move |state| {
                                let _ = progress_tx.send(Delta::RefreshProgress {
                                    tag: progress_tag.clone(),
                                    state,
                                });
                            },
                        );
                        let _ = tx.send(Delta::RefreshFinished { tag, outcome });
                    });
                }
            }
        }
    })
}

/// Runs the five dashboard fetches side by side. Each one reports its own
/// slice as soon as it settles; `FetchGroupSettled` follows the last one.
pub fn run_fetch_group(
    pool: &Option<rayon::ThreadPool>,
    api: &dyn Transport,
    tag: &FetchTag,
    page_size: u32,
    tx: &Sender<Delta>,
) {
    with_fetch_pool(pool, || {
        rayon::scope(|s| {
            s.spawn(|_| {
                let result =
                    fetch_latest_prediction(api, &tag.variant).map_err(|err| format!("{err:#}"));
                let _ = tx.send(Delta::SetLatestPrediction {
                    tag: tag.clone(),
                    result,
                });
            });
            s.spawn(|_| {
                let result = fetch_page(api, &tag.variant, 1, page_size)
                    .map_err(|err| format!("{err:#}"));
                let _ = tx.send(Delta::SetHistoryPage {
                    tag: tag.clone(),
                    page: 1,
                    result,
                });
            });
            s.spawn(|_| {
                let result = fetch_accuracy(api, &tag.variant).map_err(|err| format!("{err:#}"));
                let _ = tx.send(Delta::SetAccuracy {
                    tag: tag.clone(),
                    result,
                });
            });
            s.spawn(|_| {
                let result =
                    fetch_stats_summary(api, &tag.variant).map_err(|err| format!("{err:#}"));
                let _ = tx.send(Delta::SetStatsSummary {
                    tag: tag.clone(),
                    result,
                });
            });
            s.spawn(|_| {
                let result =
                    fetch_cooccurrence(api, &tag.variant).map_err(|err| format!("{err:#}"));
                let _ = tx.send(Delta::SetCooccurrence {
                    tag: tag.clone(),
                    result,
                });
            });
        });
    });
    let _ = tx.send(Delta::FetchGroupSettled { tag: tag.clone() });
}

pub fn build_fetch_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.clamp(2, 32))
        .build()
        .ok()
}

fn with_fetch_pool<T>(pool: &Option<rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}
