//! 掃描・確認・紀錄フローの制御
//!
//! 状態遷移は `transition`（純粋関数）に集約し、`Controller` は
//! 遷移が返した副作用（抽出・保存・削除）を実行して結果をイベントとして戻す。

mod state;
mod transition;

pub use state::{AppState, Step, ViewMode};
pub use transition::{transition, Effect, Event, TransitionError};

use crate::analyzer::{analyze_with_deadline, ExtractionError, Extractor};
use crate::store::{KeyValueStore, ReportStore};
use safety_lens_common::IncidentReport;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 抽出失敗時の表示メッセージ
pub const EXTRACTION_FAILED_MESSAGE: &str = "分析失敗，請重試或確保圖片清晰。";
pub const EXTRACTION_TIMEOUT_MESSAGE: &str = "分析逾時，請重試。";
pub const EXTRACTION_CANCELLED_MESSAGE: &str = "已取消分析。";

/// 抽出エラーをユーザー向けメッセージへ
pub fn extraction_failure_message(err: &ExtractionError) -> &'static str {
    match err {
        ExtractionError::Timeout(_) => EXTRACTION_TIMEOUT_MESSAGE,
        ExtractionError::Cancelled => EXTRACTION_CANCELLED_MESSAGE,
        _ => EXTRACTION_FAILED_MESSAGE,
    }
}

pub struct Controller<S, E> {
    state: AppState,
    store: ReportStore<S>,
    extractor: E,
    timeout: Duration,
}

impl<S: KeyValueStore, E: Extractor> Controller<S, E> {
    /// 紀錄を読み込んで初期化（読込失敗は警告として状態に残す）
    pub fn new(store: ReportStore<S>, extractor: E, timeout: Duration) -> Self {
        let mut controller = Self {
            state: AppState::default(),
            store,
            extractor,
            timeout,
        };
        controller.refresh_history();
        controller
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn store(&self) -> &ReportStore<S> {
        &self.store
    }

    /// ストアから紀錄を読み直す
    pub fn refresh_history(&mut self) {
        let result = self.store.load_all().map_err(|e| {
            warn!(error = %e, "failed to load history");
            e.to_string()
        });
        // HistorySynced はどの状態からでも受理される
        let _ = transition(&mut self.state, Event::HistorySynced { result, saved_at: None });
    }

    pub async fn dispatch(&mut self, event: Event) -> Result<(), TransitionError> {
        self.dispatch_with_cancel(event, std::future::pending()).await
    }

    /// イベントを適用し、副作用を実行し終えるまで処理する
    ///
    /// 最初のイベントが拒否された場合のみエラーを返す（状態は変わらない）。
    /// `cancel` が完了すると進行中の抽出は `Cancelled` で終わる。
    pub async fn dispatch_with_cancel<C>(&mut self, event: Event, cancel: C) -> Result<(), TransitionError>
    where
        C: Future<Output = ()>,
    {
        let mut cancel = std::pin::pin!(cancel);
        let mut queue = VecDeque::from([event]);
        let mut initial = true;

        while let Some(event) = queue.pop_front() {
            let effects = match transition(&mut self.state, event) {
                Ok(effects) => effects,
                Err(e) if initial => return Err(e),
                Err(e) => {
                    warn!(error = %e, "follow-up event rejected");
                    continue;
                }
            };
            initial = false;

            for effect in effects {
                let follow_up = self.run_effect(effect, cancel.as_mut()).await;
                queue.push_back(follow_up);
            }
        }

        Ok(())
    }

    async fn run_effect<C>(&self, effect: Effect, cancel: Pin<&mut C>) -> Event
    where
        C: Future<Output = ()>,
    {
        match effect {
            Effect::Extract(images) => {
                debug!(pages = images.len(), "extraction started");
                match analyze_with_deadline(&self.extractor, &images, self.timeout, cancel).await {
                    Ok(fields) => {
                        let report = IncidentReport::stamp(
                            fields,
                            uuid::Uuid::new_v4().to_string(),
                            chrono::Utc::now().timestamp_millis(),
                        );
                        info!(id = %report.id, "extraction finished");
                        Event::ExtractionSucceeded(report)
                    }
                    Err(e) => {
                        warn!(error = %e, "extraction failed");
                        Event::ExtractionFailed(extraction_failure_message(&e).to_string())
                    }
                }
            }
            Effect::Persist(report) => {
                let saved_at = chrono::Utc::now().timestamp_millis();
                let result = self.store.upsert(report).map_err(|e| {
                    warn!(error = %e, "failed to save report");
                    e.to_string()
                });
                Event::HistorySynced {
                    result,
                    saved_at: Some(saved_at),
                }
            }
            Effect::Delete(id) => {
                let result = self.store.delete_by_id(&id).map_err(|e| {
                    warn!(error = %e, id = %id, "failed to delete report");
                    e.to_string()
                });
                Event::HistorySynced { result, saved_at: None }
            }
        }
    }
}
