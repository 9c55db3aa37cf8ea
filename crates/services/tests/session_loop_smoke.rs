use services::sessions::input::{Key, StudyCommand, study_command};
use services::{AppServices, ExamState, SequenceOrder, StudyMode};
use study_core::filter::{FilterCriteria, Selection};
use study_core::import::RawRow;
use study_core::model::{Confidence, ExamConfig, QuestionId, SetId};
use study_core::time::fixed_clock;

fn row(pairs: &[(&str, &str)]) -> RawRow {
    pairs
        .iter()
        .map(|(h, v)| ((*h).to_string(), (*v).to_string()))
        .collect()
}

fn sheet() -> Vec<RawRow> {
    vec![
        row(&[("Nº", "1"), ("Sección", "Anatomía"), ("Tema", "Huesos"), ("Pregunta", "¿Fémur?")]),
        row(&[("Nº", "2"), ("Sección", "Anatomía"), ("Tema", "Músculos"), ("Pregunta", "¿Bíceps?")]),
        row(&[("Nº", "3"), ("Sección", "Farmacología"), ("Tema", "Dosis"), ("Pregunta", "¿mg/kg?")]),
        row(&[("Nº", "4"), ("Sección", "Farmacología"), ("Tema", "Vías"), ("Pregunta", "¿IV?")]),
    ]
}

fn c(v: u8) -> Confidence {
    Confidence::new(v).unwrap()
}

#[tokio::test]
async fn study_then_review_then_exam() {
    let services = AppServices::in_memory(fixed_clock(), Vec::new());
    let set_id = SetId::new("sanitaria");
    services
        .question_sets()
        .import_set(set_id.clone(), "Sanitaria", &sheet())
        .await
        .unwrap();

    let app = services.open_set(&set_id).await.unwrap();
    let study = services.study_loop(&app).with_seed(1);

    // Study every question in order, driven by key presses.
    let mut session = study
        .start(StudyMode::Study, FilterCriteria::default(), SequenceOrder::Sequential)
        .await
        .unwrap();
    for digit in ['5', '1', '4', '2'] {
        let reveal = study_command(StudyMode::Study, Key::Space).unwrap();
        study.dispatch(&mut session, reveal).await.unwrap();
        let rate = study_command(StudyMode::Study, Key::Char(digit)).unwrap();
        assert!(matches!(rate, StudyCommand::Confidence(_)));
        study.dispatch(&mut session, rate).await.unwrap();
    }
    assert_eq!(session.current().unwrap().id(), QuestionId::new(4));

    // Bookmark the weak anatomy question, then review only weak ones.
    let mut weak = study
        .start(
            StudyMode::Review,
            FilterCriteria::default()
                .with_sections(Selection::only(["Anatomía"]))
                .with_confidence_range(c(1), c(2))
                .with_include_no_confidence(false),
            SequenceOrder::Shuffled,
        )
        .await
        .unwrap();
    assert_eq!(weak.visible_questions().len(), 1);
    assert!(study.toggle_bookmark(&weak).await.unwrap().is_marked());
    study.submit_confidence(&mut weak, c(3)).await.unwrap();

    let state = app.snapshot().await;
    let stats = state.stats();
    assert_eq!(stats.answered, 4);
    assert_eq!(stats.marked_for_review, 1);
    assert_eq!(state.record(QuestionId::new(2)).unwrap().confidence_avg(), Some(2.0));

    // Exam over the whole set.
    let mut run = services
        .exam_loop(&app)
        .with_seed(4)
        .start(ExamConfig::default().with_question_count(3).with_timer(false))
        .await
        .unwrap();
    run.answer(c(5)).await.unwrap();
    run.skip().await.unwrap();
    run.answer(c(3)).await.unwrap();
    assert_eq!(run.state().await, ExamState::Finished);
    let summary = run.summary().await.unwrap();
    assert_eq!(summary.answered(), 2);
    assert_eq!(summary.skipped(), 1);
    assert_eq!(summary.score(), 80);

    let total_shown: u32 = app.progress().await.values().map(|r| r.times_shown()).sum();
    assert_eq!(total_shown, 4 + 1 + 2);

    // Export and delete.
    let export = services.export_progress(&set_id).await.unwrap();
    assert_eq!(export.len(), 4);
    assert!(services.question_sets().delete_set(&set_id).await.unwrap());
    assert!(services.progress().load(&set_id).await.is_empty());
}

#[tokio::test]
async fn sqlite_backed_services_persist_across_reopen() {
    let url = "sqlite:file:memdb_services_reopen?mode=memory&cache=shared";
    let services = AppServices::new_sqlite(url, fixed_clock(), Vec::new())
        .await
        .unwrap();
    let set_id = SetId::new("persisted");
    services
        .question_sets()
        .import_set(set_id.clone(), "Persisted", &sheet())
        .await
        .unwrap();

    {
        let app = services.open_set(&set_id).await.unwrap();
        let study = services.study_loop(&app);
        let mut session = study
            .start(StudyMode::Study, FilterCriteria::default(), SequenceOrder::Sequential)
            .await
            .unwrap();
        study.submit_confidence(&mut session, c(4)).await.unwrap();
    }

    let reopened = services.open_set(&set_id).await.unwrap();
    let record = reopened.record(QuestionId::new(1)).await.unwrap();
    assert_eq!(record.last_confidence(), Some(c(4)));
    assert_eq!(record.times_shown(), 1);
}
