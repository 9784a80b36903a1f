//! The `trulearn init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("trulearn.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("question-sets")?;
    write_if_missing(Path::new("question-sets/example.json"), EXAMPLE_QUESTION_SET)?;

    std::fs::create_dir_all("answers")?;
    write_if_missing(Path::new("answers/example.toml"), EXAMPLE_ANSWER_SHEET)?;

    println!("\nNext steps:");
    println!("  1. Edit trulearn.toml to point at your TruLearn API (the sample uses the mock)");
    println!("  2. Run: trulearn validate --questions question-sets/example.json");
    println!(
        "  3. Run: trulearn submit --questions question-sets/example.json \
         --answers answers/example.toml"
    );

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# TruLearn configuration

student_id = 1
parallelism = 1
num_variations = 5
output_dir = "./trulearn-results"

# Offline mock service. Answers containing a rule's text get its classification;
# everything else is reported as genuine.
[service]
type = "mock"

[[service.rules]]
contains = "converts light energy into chemical energy"
detection_type = "memorization"
confidence_score = 0.92
reason = "Nearly identical to the reference summary"

[[service.rules]]
contains = "plants make food"
detection_type = "surface"
confidence_score = 0.55
reason = "Correct but shallow"

# To use the real API instead:
#
# [service]
# type = "http"
# base_url = "${TRULEARN_API_URL}"
# timeout_secs = 120
# api_token = "${TRULEARN_API_TOKEN}"
"#;

const EXAMPLE_QUESTION_SET: &str = r#"{
  "questions": [
    {
      "id": 1,
      "type": "multiple_choice",
      "question_text": "Which organelle carries out photosynthesis?",
      "concept": "Photosynthesis",
      "difficulty": "easy",
      "options": {
        "A": "Mitochondrion",
        "B": "Chloroplast",
        "C": "Nucleus",
        "D": "Ribosome"
      },
      "correct_answer": "B"
    },
    {
      "id": 2,
      "type": "open_ended",
      "question_text": "In your own words, what does photosynthesis accomplish?",
      "concept": "Photosynthesis",
      "difficulty": "medium",
      "sample_answer": "Photosynthesis converts light energy into chemical energy stored in glucose."
    },
    {
      "id": 3,
      "type": "multiple_choice",
      "question_text": "Which molecule carries energy released during cellular respiration?",
      "concept": "Cellular Respiration",
      "difficulty": "medium",
      "options": {
        "A": "ATP",
        "B": "DNA",
        "C": "Starch",
        "D": "Chlorophyll"
      },
      "correct_answer": "A"
    },
    {
      "id": 4,
      "type": "open_ended",
      "question_text": "Why do cells need oxygen during aerobic respiration?",
      "concept": "Cellular Respiration",
      "difficulty": "hard",
      "sample_answer": "Oxygen is the final electron acceptor in the electron transport chain."
    }
  ]
}
"#;

const EXAMPLE_ANSWER_SHEET: &str = r#"# Answers to question-sets/example.json
student_id = 1

[[answers]]
question_id = 1
answer = "B"
response_time_secs = 8

[[answers]]
question_id = 2
answer = "Photosynthesis converts light energy into chemical energy stored in glucose."
response_time_secs = 12

[[answers]]
question_id = 3
answer = "C"
response_time_secs = 20

[[answers]]
question_id = 4
answer = "Without oxygen at the end of the chain, electrons back up and ATP production stalls."
response_time_secs = 95
"#;
