//! 状態遷移
//!
//! `transition` は入出力を持たない純粋関数。ストア書き込みや抽出は
//! `Effect` として返し、実行結果は `Event` として戻ってくる。
//! 遷移が拒否された場合、状態は変更されない。

use super::state::{AppState, Step, ViewMode};
use crate::staging::StagedImage;
use safety_lens_common::{IncidentReport, ReportField};
use thiserror::Error;

#[derive(Debug, Clone)]
pub enum Event {
    ImageSelected { slot: usize, image: StagedImage },
    ImageRemoved { slot: usize },
    AnalyzeRequested,
    /// ID・作成日時付与済みの抽出結果
    ExtractionSucceeded(IncidentReport),
    ExtractionFailed(String),
    FieldEdited { field: ReportField, value: String },
    ResetRequested,
    ViewChanged(ViewMode),
    OpenRecord(String),
    DeleteRecord(String),
    /// ストア操作の結果。`saved_at` は保存（upsert）時のみ
    HistorySynced {
        result: Result<Vec<IncidentReport>, String>,
        saved_at: Option<i64>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Extract(Vec<StagedImage>),
    Persist(IncidentReport),
    Delete(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("正在分析中，請稍候")]
    Busy,

    #[error("請先選擇至少一張圖片")]
    NoImagesStaged,

    #[error("無效的頁面位置: {0}")]
    InvalidSlot(usize),

    #[error("只能在上載步驟進行此操作")]
    NotInUpload,

    #[error("只能在核對步驟進行此操作")]
    NotInReview,

    #[error("目前沒有進行中的分析")]
    NotProcessing,

    #[error("只能在紀錄頁面進行此操作")]
    NotInHistory,

    #[error("找不到報告: {0}")]
    RecordNotFound(String),

    #[error("{0}")]
    InvalidValue(String),
}

/// イベントを適用し、実行すべき副作用を返す
pub fn transition(state: &mut AppState, event: Event) -> Result<Vec<Effect>, TransitionError> {
    match event {
        Event::ImageSelected { slot, image } => {
            ensure_upload(state)?;
            if !state.staged.set(slot, image) {
                return Err(TransitionError::InvalidSlot(slot));
            }
            Ok(vec![])
        }

        Event::ImageRemoved { slot } => {
            ensure_upload(state)?;
            state.staged.remove(slot);
            Ok(vec![])
        }

        Event::AnalyzeRequested => {
            ensure_upload(state)?;
            if state.staged.is_empty() {
                return Err(TransitionError::NoImagesStaged);
            }
            state.step = Step::Processing;
            state.error = None;
            Ok(vec![Effect::Extract(state.staged.staged())])
        }

        Event::ExtractionSucceeded(report) => {
            if state.step != Step::Processing {
                return Err(TransitionError::NotProcessing);
            }
            state.current = Some(report.clone());
            state.step = Step::Review;
            state.error = None;
            state.last_saved = None;
            Ok(vec![Effect::Persist(report)])
        }

        Event::ExtractionFailed(message) => {
            if state.step != Step::Processing {
                return Err(TransitionError::NotProcessing);
            }
            // 再試行できるよう写真は残す
            state.step = Step::Upload;
            state.error = Some(message);
            Ok(vec![])
        }

        Event::FieldEdited { field, value } => {
            let current = match (&state.view, &state.step, &state.current) {
                (ViewMode::Scan, Step::Review, Some(current)) => current,
                _ => return Err(TransitionError::NotInReview),
            };

            let mut updated = current.clone();
            updated
                .fields
                .set(field, value)
                .map_err(|e| TransitionError::InvalidValue(e.to_string()))?;

            state.current = Some(updated.clone());
            Ok(vec![Effect::Persist(updated)])
        }

        Event::ResetRequested => {
            if state.is_busy() {
                return Err(TransitionError::Busy);
            }
            state.reset_scan();
            Ok(vec![])
        }

        Event::ViewChanged(view) => {
            state.view = view;
            Ok(vec![])
        }

        Event::OpenRecord(id) => {
            ensure_history(state)?;
            if state.is_busy() {
                return Err(TransitionError::Busy);
            }
            let report = state
                .history
                .iter()
                .find(|r| r.id == id)
                .cloned()
                .ok_or(TransitionError::RecordNotFound(id))?;

            // 写真は保存していないため、紀錄から開いた報告には付かない
            state.reset_scan();
            state.current = Some(report);
            state.step = Step::Review;
            state.view = ViewMode::Scan;
            Ok(vec![])
        }

        Event::DeleteRecord(id) => {
            ensure_history(state)?;
            if state.current.as_ref().is_some_and(|r| r.id == id) {
                state.reset_scan();
            }
            Ok(vec![Effect::Delete(id)])
        }

        Event::HistorySynced { result, saved_at } => {
            match result {
                Ok(reports) => {
                    state.history = reports;
                    state.storage_warning = None;
                    if saved_at.is_some() {
                        state.last_saved = saved_at;
                    }
                }
                Err(message) => {
                    // 失敗を「紀錄なし」と区別するため、キャッシュは保持
                    state.storage_warning = Some(message);
                }
            }
            Ok(vec![])
        }
    }
}

fn ensure_upload(state: &AppState) -> Result<(), TransitionError> {
    if state.is_busy() {
        return Err(TransitionError::Busy);
    }
    if state.view != ViewMode::Scan || state.step != Step::Upload {
        return Err(TransitionError::NotInUpload);
    }
    Ok(())
}

fn ensure_history(state: &AppState) -> Result<(), TransitionError> {
    if state.view != ViewMode::History {
        return Err(TransitionError::NotInHistory);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use safety_lens_common::{Answer, ReportFields};

    fn page(name: &str) -> StagedImage {
        StagedImage::new(name, "image/jpeg", vec![1, 2, 3])
    }

    fn report(id: &str) -> IncidentReport {
        IncidentReport::stamp(
            ReportFields {
                resident_name: "陳大文".into(),
                has_injury: Answer::Yes,
                hospitalization_status: Answer::No,
                root_cause_analysis: "地滑".into(),
                ..Default::default()
            },
            id,
            1_714_545_000_000,
        )
    }

    fn processing_state() -> AppState {
        let mut state = AppState::default();
        transition(&mut state, Event::ImageSelected { slot: 0, image: page("p1.jpg") }).unwrap();
        transition(&mut state, Event::AnalyzeRequested).unwrap();
        state
    }

    fn review_state() -> AppState {
        let mut state = processing_state();
        transition(&mut state, Event::ExtractionSucceeded(report("r1"))).unwrap();
        state
    }

    #[test]
    fn test_select_images_stays_in_upload() {
        let mut state = AppState::default();
        let effects = transition(&mut state, Event::ImageSelected { slot: 1, image: page("p2.jpg") }).unwrap();

        assert!(effects.is_empty());
        assert_eq!(state.step, Step::Upload);
        assert_eq!(state.staged.len(), 1);
    }

    #[test]
    fn test_invalid_slot_rejected() {
        let mut state = AppState::default();
        let err = transition(&mut state, Event::ImageSelected { slot: 2, image: page("p3.jpg") }).unwrap_err();
        assert_eq!(err, TransitionError::InvalidSlot(2));
        assert!(state.staged.is_empty());
    }

    #[test]
    fn test_analyze_requires_images() {
        let mut state = AppState::default();
        let err = transition(&mut state, Event::AnalyzeRequested).unwrap_err();
        assert_eq!(err, TransitionError::NoImagesStaged);
        assert_eq!(state.step, Step::Upload);
    }

    #[test]
    fn test_analyze_emits_extract_in_page_order() {
        let mut state = AppState::default();
        transition(&mut state, Event::ImageSelected { slot: 1, image: page("p2.jpg") }).unwrap();
        transition(&mut state, Event::ImageSelected { slot: 0, image: page("p1.jpg") }).unwrap();

        let effects = transition(&mut state, Event::AnalyzeRequested).unwrap();
        assert_eq!(state.step, Step::Processing);
        match effects.as_slice() {
            [Effect::Extract(images)] => {
                assert_eq!(images[0].file_name, "p1.jpg");
                assert_eq!(images[1].file_name, "p2.jpg");
            }
            other => panic!("unexpected effects {:?}", other),
        }
    }

    #[test]
    fn test_second_analyze_is_busy() {
        let mut state = processing_state();
        assert_eq!(transition(&mut state, Event::AnalyzeRequested).unwrap_err(), TransitionError::Busy);
        assert_eq!(
            transition(&mut state, Event::ImageSelected { slot: 1, image: page("p2.jpg") }).unwrap_err(),
            TransitionError::Busy
        );
        assert_eq!(transition(&mut state, Event::ResetRequested).unwrap_err(), TransitionError::Busy);
    }

    #[test]
    fn test_extraction_success_moves_to_review() {
        let mut state = processing_state();
        let effects = transition(&mut state, Event::ExtractionSucceeded(report("r1"))).unwrap();

        assert_eq!(state.step, Step::Review);
        assert_eq!(state.current.as_ref().unwrap().id, "r1");
        assert_eq!(effects, vec![Effect::Persist(report("r1"))]);
    }

    #[test]
    fn test_extraction_failure_keeps_images() {
        let mut state = processing_state();
        transition(&mut state, Event::ExtractionFailed("分析失敗".into())).unwrap();

        assert_eq!(state.step, Step::Upload);
        assert_eq!(state.error.as_deref(), Some("分析失敗"));
        assert_eq!(state.staged.len(), 1);
        assert!(state.current.is_none());
    }

    #[test]
    fn test_extraction_result_outside_processing_rejected() {
        let mut state = AppState::default();
        assert_eq!(
            transition(&mut state, Event::ExtractionSucceeded(report("r1"))).unwrap_err(),
            TransitionError::NotProcessing
        );
    }

    #[test]
    fn test_edit_persists_full_record() {
        let mut state = review_state();
        let effects = transition(
            &mut state,
            Event::FieldEdited {
                field: ReportField::RootCauseAnalysis,
                value: "鞋履不當".into(),
            },
        )
        .unwrap();

        let current = state.current.clone().unwrap();
        assert_eq!(current.id, "r1");
        assert_eq!(current.created_at, 1_714_545_000_000);
        assert_eq!(current.fields.root_cause_analysis, "鞋履不當");
        assert_eq!(effects, vec![Effect::Persist(current)]);
    }

    #[test]
    fn test_edit_answer_field_rejects_not_applicable() {
        let mut state = review_state();
        let err = transition(
            &mut state,
            Event::FieldEdited {
                field: ReportField::HasInjury,
                value: "不適用".into(),
            },
        )
        .unwrap_err();

        assert!(matches!(err, TransitionError::InvalidValue(_)));
        assert_eq!(state.current.unwrap().fields.has_injury, Answer::Yes);
    }

    #[test]
    fn test_edit_outside_review_rejected() {
        let mut state = AppState::default();
        let err = transition(
            &mut state,
            Event::FieldEdited {
                field: ReportField::Location,
                value: "走廊".into(),
            },
        )
        .unwrap_err();
        assert_eq!(err, TransitionError::NotInReview);
    }

    #[test]
    fn test_reset_clears_scan_flow() {
        let mut state = review_state();
        transition(&mut state, Event::ResetRequested).unwrap();

        assert_eq!(state.step, Step::Upload);
        assert!(state.current.is_none());
        assert!(state.staged.is_empty());
        assert!(state.error.is_none());
    }

    #[test]
    fn test_open_record_from_history() {
        let mut state = AppState {
            history: vec![report("r1"), report("r2")],
            ..Default::default()
        };
        transition(&mut state, Event::ImageSelected { slot: 0, image: page("p1.jpg") }).unwrap();
        transition(&mut state, Event::ViewChanged(ViewMode::History)).unwrap();
        transition(&mut state, Event::OpenRecord("r2".into())).unwrap();

        assert_eq!(state.view, ViewMode::Scan);
        assert_eq!(state.step, Step::Review);
        assert_eq!(state.current.unwrap().id, "r2");
        assert!(state.staged.is_empty());
    }

    #[test]
    fn test_open_unknown_record() {
        let mut state = AppState {
            view: ViewMode::History,
            ..Default::default()
        };
        assert_eq!(
            transition(&mut state, Event::OpenRecord("nope".into())).unwrap_err(),
            TransitionError::RecordNotFound("nope".into())
        );
    }

    #[test]
    fn test_delete_requires_history_view() {
        let mut state = review_state();
        assert_eq!(
            transition(&mut state, Event::DeleteRecord("r1".into())).unwrap_err(),
            TransitionError::NotInHistory
        );
    }

    #[test]
    fn test_delete_current_record_resets_scan() {
        let mut state = review_state();
        transition(&mut state, Event::ViewChanged(ViewMode::History)).unwrap();
        let effects = transition(&mut state, Event::DeleteRecord("r1".into())).unwrap();

        assert_eq!(effects, vec![Effect::Delete("r1".into())]);
        assert_eq!(state.view, ViewMode::History);
        assert_eq!(state.step, Step::Upload);
        assert!(state.current.is_none());
    }

    #[test]
    fn test_delete_other_record_keeps_current() {
        let mut state = review_state();
        transition(&mut state, Event::ViewChanged(ViewMode::History)).unwrap();
        transition(&mut state, Event::DeleteRecord("other".into())).unwrap();

        assert_eq!(state.step, Step::Review);
        assert_eq!(state.current.unwrap().id, "r1");
    }

    #[test]
    fn test_history_sync_failure_keeps_cache() {
        let mut state = AppState {
            history: vec![report("r1")],
            ..Default::default()
        };
        transition(
            &mut state,
            Event::HistorySynced {
                result: Err("寫入紀錄失敗".into()),
                saved_at: Some(10),
            },
        )
        .unwrap();

        assert_eq!(state.history.len(), 1);
        assert_eq!(state.storage_warning.as_deref(), Some("寫入紀錄失敗"));
        assert!(state.last_saved.is_none());

        transition(
            &mut state,
            Event::HistorySynced {
                result: Ok(vec![]),
                saved_at: Some(20),
            },
        )
        .unwrap();
        assert!(state.history.is_empty());
        assert!(state.storage_warning.is_none());
        assert_eq!(state.last_saved, Some(20));
    }
}
