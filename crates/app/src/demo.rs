//! Sample content for running the engine without a backend.

use exam_core::geometry::{Point, Rect};
use exam_core::model::{
    Exercise, ExerciseId, Hotspot, HotspotFields, HotspotId, HotspotKind, ItemLabels, OptionId,
    Question, QuestionId, QuestionKind, QuestionOption, StepId, StepImage, TopicId,
};
use storage::repository::{
    ExerciseRepository, HotspotRepository, InMemoryRepository, StepRepository, StorageError,
};

fn labels(category: &str, topic: &str) -> ItemLabels {
    ItemLabels {
        category: Some(category.to_owned()),
        topic: Some(topic.to_owned()),
    }
}

fn options(texts: &[&str]) -> Vec<QuestionOption> {
    (1_u64..)
        .zip(texts)
        .map(|(id, text)| QuestionOption::new(OptionId::new(id), *text))
        .collect()
}

fn questions() -> Result<Vec<Question>, Box<dyn std::error::Error>> {
    let topic = TopicId::new(1);
    Ok(vec![
        Question::new(
            QuestionId::new(1),
            topic,
            "Passwords should be shared over chat when urgent.",
            QuestionKind::TrueFalse,
        )?,
        Question::new(
            QuestionId::new(2),
            topic,
            "Which shortcut saves a document?",
            QuestionKind::SingleChoice {
                options: options(&["Ctrl+S", "Ctrl+P", "Ctrl+Q"]),
            },
        )?,
        Question::new(
            QuestionId::new(3),
            topic,
            "Which of these are web browsers?",
            QuestionKind::MultipleChoice {
                options: options(&["Firefox", "Excel", "Chrome"]),
            },
        )?,
        Question::new(
            QuestionId::new(4),
            topic,
            "Order the steps to send an email.",
            QuestionKind::Ordering {
                options: options(&["Write the message", "Add a recipient", "Press send"]),
            },
        )?,
        Question::new(
            QuestionId::new(5),
            topic,
            "A locked screen protects an unattended computer.",
            QuestionKind::TrueFalse,
        )?,
    ])
}

/// Fill `repo` with questions and exercises. Exercise hotspots go through the
/// repository traits so they get ids and numbers the way authored ones do.
///
/// # Errors
///
/// Returns an error if any sample item is invalid or rejected by storage.
pub async fn seed(repo: &InMemoryRepository) -> Result<(), Box<dyn std::error::Error>> {
    for question in questions()? {
        repo.insert_question(question, labels("Digital skills", "Basics"))?;
    }

    let mut login = Exercise::new(ExerciseId::new(1), TopicId::new(2), "Sign in to webmail");
    login.set_complete(true);
    repo.upsert_exercise(login, labels("Exercises", "Email"))?;
    let first = add_step(repo, ExerciseId::new(1), "https://cdn.example.com/login.png").await?;
    let email = Rect::new(30.0, 40.0, 40.0, 6.0);
    add_hotspot(repo, first, HotspotKind::Textbox, email, "me@example.com").await?;
    let sign_in = Rect::new(40.0, 60.0, 20.0, 8.0);
    add_hotspot(repo, first, HotspotKind::Button, sign_in, "").await?;
    let second = add_step(repo, ExerciseId::new(1), "https://cdn.example.com/inbox.png").await?;
    let compose = Rect::new(5.0, 10.0, 15.0, 6.0);
    add_hotspot(repo, second, HotspotKind::Button, compose, "").await?;

    let mut print = Exercise::new(ExerciseId::new(2), TopicId::new(3), "Print a page");
    print.set_complete(true);
    repo.upsert_exercise(print, labels("Exercises", "Office"))?;
    let only = add_step(repo, ExerciseId::new(2), "https://cdn.example.com/print.png").await?;
    let printer = Rect::new(80.0, 5.0, 12.0, 6.0);
    add_hotspot(repo, only, HotspotKind::Button, printer, "").await?;

    Ok(())
}

async fn add_step(
    repo: &InMemoryRepository,
    exercise_id: ExerciseId,
    url: &str,
) -> Result<StepId, Box<dyn std::error::Error>> {
    let image = StepImage::new(url, 1280, 800)?;
    Ok(repo.create_step(exercise_id, &image).await?.id())
}

async fn add_hotspot(
    repo: &InMemoryRepository,
    step_id: StepId,
    kind: HotspotKind,
    rect: Rect,
    answer: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let fields = HotspotFields {
        correct_answer: (!answer.is_empty()).then(|| answer.to_owned()),
        ..HotspotFields::default()
    };
    let hotspot = Hotspot::from_persisted(HotspotId::generate(), step_id, kind, rect, fields, 1)?;
    repo.create_hotspot(&hotspot).await?;
    Ok(())
}

/// Center of a hotspot, for simulated clicks.
#[must_use]
pub fn center(hotspot: &Hotspot) -> Point {
    let rect = hotspot.rect();
    Point::new(rect.x + rect.width / 2.0, rect.y + rect.height / 2.0)
}

/// Fetch one exercise for the authoring walkthrough.
///
/// # Errors
///
/// Returns `StorageError::NotFound` if the exercise was not seeded.
pub async fn exercise(repo: &InMemoryRepository, id: ExerciseId) -> Result<Exercise, StorageError> {
    repo.fetch_exercise_detail(id).await
}
