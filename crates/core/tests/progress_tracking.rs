//! Progress tracking integration tests.
//!
//! Verifies how analysis runs report through a shared tracker:
//! - Configured stage weights
//! - Concurrent runs on one tracker
//! - Channel delivery of events

use std::sync::Arc;
use std::time::Duration;

use deepbrief_core::{
    analysis::{AnalysisConfig, AnalysisRequest, PipelineCoordinator},
    progress::{ChannelSink, OperationStatus, ProgressEvent, ProgressTracker},
    testing::{
        MockAudioExtractor, MockFrameExtractor, MockSceneDetector, MockValidator, RecordingSink,
    },
};

fn coordinator(config: AnalysisConfig, scenes: Arc<MockSceneDetector>) -> PipelineCoordinator {
    PipelineCoordinator::new(
        config,
        Arc::new(MockValidator::new()),
        Arc::new(MockAudioExtractor::new()),
        scenes,
        Arc::new(MockFrameExtractor::new()),
    )
}

/// Progress reported when the given 1-based stage starts.
fn progress_at_stage_start(events: &[ProgressEvent], stage: usize) -> Option<f64> {
    events.iter().find_map(|e| match e {
        ProgressEvent::Updated {
            progress,
            current_step_number: Some(n),
            ..
        } if *n == stage => Some(*progress),
        _ => None,
    })
}

#[tokio::test]
async fn test_configured_weights_drive_progress() {
    let sink = RecordingSink::new();
    let tracker = Arc::new(ProgressTracker::new().with_sink(Arc::new(sink.clone())));

    let mut config = AnalysisConfig::default();
    config.weights.validate = 0.25;
    config.weights.scenes = 0.35;
    config.weights.frames = 0.40;
    let coordinator = coordinator(config, Arc::new(MockSceneDetector::new()))
        .with_progress_tracker(tracker);

    let request = AnalysisRequest::new("/v/talk.mp4").with_audio(false);
    let result = coordinator.analyze_video(&request).await;
    assert!(result.success());

    let events = sink.events_for(result.run_id());
    let after_validate = progress_at_stage_start(&events, 2).unwrap();
    assert!((after_validate - 0.25).abs() < 1e-9, "{}", after_validate);
    let after_scenes = progress_at_stage_start(&events, 3).unwrap();
    assert!((after_scenes - 0.60).abs() < 1e-9, "{}", after_scenes);
}

#[tokio::test]
async fn test_stage_weights_renormalize_over_selected_stages() {
    let sink = RecordingSink::new();
    let tracker = Arc::new(ProgressTracker::new().with_sink(Arc::new(sink.clone())));
    let coordinator = coordinator(AnalysisConfig::default(), Arc::new(MockSceneDetector::new()))
        .with_progress_tracker(Arc::clone(&tracker));

    // validate 0.05 + scenes 0.35 only
    let request = AnalysisRequest::new("/v/talk.mp4")
        .with_audio(false)
        .with_frames(false);
    let result = coordinator.analyze_video(&request).await;

    let events = sink.events_for(result.run_id());
    let ProgressEvent::Started {
        total_steps,
        details,
        ..
    } = &events[0]
    else {
        panic!("first event should be Started, got {:?}", events[0]);
    };
    assert_eq!(*total_steps, 2);

    let weights: Vec<f64> = details["stages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["weight"].as_f64().unwrap())
        .collect();
    assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    assert!((weights[0] - 0.125).abs() < 1e-9);

    let after_validate = progress_at_stage_start(&events, 2).unwrap();
    assert!((after_validate - 0.125).abs() < 1e-9);
}

#[tokio::test]
async fn test_concurrent_runs_share_tracker() {
    let sink = RecordingSink::new();
    let tracker = Arc::new(ProgressTracker::new().with_sink(Arc::new(sink.clone())));
    let scenes = Arc::new(MockSceneDetector::new());
    scenes.set_delay(Duration::from_millis(20)).await;
    let coordinator = coordinator(AnalysisConfig::default(), scenes)
        .with_progress_tracker(Arc::clone(&tracker));

    let first = AnalysisRequest::new("/v/first.mp4");
    let second = AnalysisRequest::new("/v/second.mp4");
    let (a, b) = tokio::join!(
        coordinator.analyze_video(&first),
        coordinator.analyze_video(&second)
    );

    assert!(a.success() && b.success());
    assert_ne!(a.run_id(), b.run_id());
    for run_id in [a.run_id(), b.run_id()] {
        let values = sink.progress_values(run_id);
        assert!(values.windows(2).all(|w| w[1] >= w[0]), "{:?}", values);
        assert_eq!(values.last(), Some(&1.0));
        assert_eq!(
            tracker.snapshot(run_id).unwrap().status,
            OperationStatus::Completed
        );
    }

    assert_eq!(tracker.operations().len(), 2);
    assert_eq!(tracker.clear_finished(), 2);
    assert!(tracker.operations().is_empty());
}

#[tokio::test]
async fn test_channel_sink_receives_run_events() {
    let (channel, mut rx) = ChannelSink::channel(256);
    let tracker = Arc::new(ProgressTracker::new().with_sink(Arc::new(channel)));
    let coordinator = coordinator(AnalysisConfig::default(), Arc::new(MockSceneDetector::new()))
        .with_progress_tracker(tracker);

    let result = coordinator
        .analyze_video(&AnalysisRequest::new("/v/talk.mp4"))
        .await;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert!(matches!(events.first(), Some(ProgressEvent::Started { .. })));
    match events.last() {
        Some(ProgressEvent::Completed {
            operation_id,
            details,
        }) => {
            assert_eq!(operation_id, result.run_id());
            assert_eq!(details["total_frames"], 3);
        }
        other => panic!("expected Completed, got {:?}", other),
    }
}
