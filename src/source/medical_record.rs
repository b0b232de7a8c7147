//! Synthetic medical record generator
//!
//! Builds a plausible-looking clinical note from sentence templates with
//! `{placeholder}` slots. None of it describes a real patient.

use anyhow::Result;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use super::DocumentSource;

const DEFAULT_WORD_COUNT: usize = 1000;
const WORDS_PER_SENTENCE: usize = 15;

const CHIEF_COMPLAINTS: &[&str] = &[
    "chest pain",
    "shortness of breath",
    "abdominal pain",
    "headache",
    "dizziness",
    "fatigue",
    "cough",
    "fever",
    "back pain",
    "nausea and vomiting",
];

const HPI_OPENING: &str = "The patient is a {age}-year-old {sex} presenting with";

const HPI_PHRASES: &[&str] = &[
    "Symptoms began {duration} ago and have been {progression}.",
    "The pain is described as {quality} and located in the {location}.",
    "It is exacerbated by {exacerbating_factors} and relieved by {relieving_factors}.",
    "Associated symptoms include {associated_symptoms}.",
    "The patient denies {denied_symptoms}.",
    "Review of systems is otherwise negative except as noted.",
    "Patient reports gradual onset of symptoms over the past few days.",
    "Severity is rated {severity}/10.",
    "No significant trauma reported.",
];

const PMH_PHRASES: &[&str] = &[
    "Past medical history is significant for {conditions}.",
    "Surgical history includes {surgeries}.",
    "Family history is positive for {family_conditions} in {relative}.",
    "Social history reveals {social_factors}.",
    "Patient takes {medications} daily.",
    "Allergies include {allergies}.",
    "Patient denies history of hypertension, diabetes, or heart disease.",
    "Immunizations are up to date.",
    "No known drug allergies.",
];

const EXAM_FINDINGS: &[&str] = &[
    "Vital signs: BP {bp}, HR {hr}, RR {rr}, Temp {temp}F, SpO2 {spo2}% on room air.",
    "General: Patient is alert, oriented, and in no acute distress.",
    "HEENT: Head is normocephalic, atraumatic. Pupils are equal, round, reactive to light.",
    "Neck: Supple, no lymphadenopathy or thyromegaly.",
    "Cardiovascular: Regular rate and rhythm, no murmurs, rubs, or gallops.",
    "Respiratory: Lungs clear to auscultation bilaterally, no wheezes or crackles.",
    "Abdomen: Soft, non-tender, non-distended. Bowel sounds present.",
    "Extremities: No cyanosis, clubbing, or edema. Pulses are 2+ bilaterally.",
    "Neurological: Cranial nerves II-XII intact. Strength 5/5 throughout.",
    "Skin: Warm, dry, intact without rashes or lesions.",
];

const AP_PHRASES: &[&str] = &[
    "Assessment: {diagnosis_list}.",
    "Plan: Admit to {service} service for further management.",
    "Plan: Discharge home with instructions for {follow_up}.",
    "Will obtain {labs_imaging} for further evaluation.",
    "Consult {specialty} for recommendations.",
    "Start patient on {medication_treatment}. Monitor for response.",
    "Provide symptomatic relief with {symptomatic_treatment}.",
    "Educate patient on {education_topic} and importance of compliance.",
    "Follow up with primary care physician in {fup_time}.",
    "Differential diagnosis includes {diff_dx} but less likely.",
];

/// Template-driven fake medical record source
pub struct MedicalRecordGenerator<R: Rng = StdRng> {
    rng: R,
    word_count: usize,
}

impl MedicalRecordGenerator<StdRng> {
    /// Generator seeded from the operating system
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Reproducible generator
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for MedicalRecordGenerator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> MedicalRecordGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng, word_count: DEFAULT_WORD_COUNT }
    }

    /// Approximate target length in words
    pub fn word_count(mut self, word_count: usize) -> Self {
        self.word_count = word_count.max(WORDS_PER_SENTENCE);
        self
    }

    /// Generate one record
    pub fn generate(&mut self) -> String {
        let target_sentences = self.word_count / WORDS_PER_SENTENCE;
        let hpi_sentences = 5.max(target_sentences / 4);
        let pmh_sentences = 4.max(target_sentences / 5);
        let exam_sentences = 8.max(target_sentences / 4);
        let ap_sentences = 5.max(target_sentences * 3 / 10);

        let initial = char::from(b'A' + self.rng.random_range(0..26u8));
        let patient_name = format!("John Doe {}", initial);
        let dob = format!(
            "19{}-{:02}-{:02}",
            self.rng.random_range(50..=90),
            self.rng.random_range(1..=12),
            self.rng.random_range(1..=28)
        );
        let chief_complaint = self.pick(CHIEF_COMPLAINTS);

        let mut record = format!("## Patient Record: {}\n\n", self.rng.random_range(1000..=9999));
        record.push_str(&format!("**Date:** {}\n", Utc::now().format("%Y-%m-%d")));
        record.push_str(&format!("**Patient Name:** {}\n", patient_name));
        record.push_str(&format!("**DOB:** {}\n\n", dob));
        record.push_str(&format!("**Chief Complaint:** {}.\n\n", capitalize(chief_complaint)));

        record.push_str("**History of Present Illness:**\n");
        let mut hpi = format!("{} {}. ", self.fill(HPI_OPENING), chief_complaint);
        hpi.push_str(&self.padded_section(HPI_PHRASES, hpi_sentences - 1));
        record.push_str(hpi.trim());
        record.push_str("\n\n");

        record.push_str("**Past Medical History:**\n");
        record.push_str(&self.padded_section(PMH_PHRASES, pmh_sentences));
        record.push_str("\n\n");

        record.push_str("**Physical Examination:**\n");
        let mut exam: Vec<String> = EXAM_FINDINGS
            .choose_multiple(&mut self.rng, exam_sentences.min(EXAM_FINDINGS.len()))
            .copied()
            .collect::<Vec<_>>()
            .into_iter()
            .map(|line| self.fill(line))
            .collect();
        while exam.len() < exam_sentences {
            let line = self.pick(EXAM_FINDINGS);
            exam.push(self.fill(line));
        }
        for line in &exam {
            record.push_str(&format!("- {}\n", line));
        }
        record.push('\n');

        record.push_str("**Assessment and Plan:**\n");
        record.push_str(&self.padded_section(AP_PHRASES, ap_sentences));
        record.push('\n');

        let current_words = record.split_whitespace().count();
        if current_words * 5 < self.word_count * 4 {
            let padding = (self.word_count - current_words) / WORDS_PER_SENTENCE;
            let pool: Vec<&str> = HPI_PHRASES.iter().chain(AP_PHRASES).copied().collect();
            record.push_str("\n**Additional Notes:**\n");
            record.push_str(&self.section(&pool, padding.max(1)));
            record.push('\n');
        }

        record
    }

    fn pick(&mut self, options: &[&'static str]) -> &'static str {
        options.choose(&mut self.rng).copied().unwrap_or_default()
    }

    /// Sample distinct templates and fill them in
    fn section(&mut self, phrases: &[&str], sentences: usize) -> String {
        let chosen: Vec<&str> = phrases
            .choose_multiple(&mut self.rng, sentences.min(phrases.len()))
            .copied()
            .collect();
        chosen
            .into_iter()
            .map(|p| self.fill(p))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Section topped up with extra sentences until it reaches roughly ten
    /// words per requested sentence
    fn padded_section(&mut self, phrases: &[&str], sentences: usize) -> String {
        let mut text = self.section(phrases, sentences);
        while text.split_whitespace().count() < sentences * 10 {
            text.push(' ');
            text.push_str(&self.section(phrases, 2));
        }
        text.trim().to_string()
    }

    /// Replace every `{name}` slot with a freshly drawn value
    fn fill(&mut self, template: &str) -> String {
        let mut out = String::with_capacity(template.len() + 32);
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else { break };
            out.push_str(&rest[..start]);
            let name = &rest[start + 1..start + len];
            out.push_str(&self.placeholder(name));
            rest = &rest[start + len + 1..];
        }
        out.push_str(rest);
        out
    }

    fn list(&mut self, options: &[&str], min: usize, max: usize) -> String {
        let k = self.rng.random_range(min..=max.min(options.len()));
        options
            .choose_multiple(&mut self.rng, k)
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn placeholder(&mut self, name: &str) -> String {
        match name {
            "age" => self.rng.random_range(20..=80).to_string(),
            "sex" => self.pick(&["male", "female"]).to_string(),
            "duration" => self.pick(&["2 days", "1 week", "3 hours", "several months"]).to_string(),
            "progression" => self.pick(&["worsening", "improving", "stable", "intermittent"]).to_string(),
            "quality" => self.pick(&["sharp", "dull", "aching", "burning", "pressure-like"]).to_string(),
            "location" => self
                .pick(&[
                    "left lower quadrant",
                    "substernal area",
                    "right flank",
                    "occipital region",
                    "epigastrium",
                ])
                .to_string(),
            "exacerbating_factors" => self.pick(&["movement", "deep breaths", "eating", "stress"]).to_string(),
            "relieving_factors" => self.pick(&["rest", "medication", "position change", "nothing"]).to_string(),
            "associated_symptoms" => self.list(
                &["fever", "chills", "sweats", "shortness of breath", "dizziness", "nausea"],
                1,
                3,
            ),
            "denied_symptoms" => self.list(
                &["chest pain", "cough", "headache", "vision changes", "weakness"],
                1,
                3,
            ),
            "severity" => self.rng.random_range(3..=9).to_string(),
            "conditions" => self.list(
                &["hypertension", "diabetes mellitus type 2", "asthma", "hyperlipidemia", "GERD"],
                1,
                3,
            ),
            "surgeries" => self
                .pick(&[
                    "appendectomy in childhood",
                    "cholecystectomy 5 years ago",
                    "knee arthroscopy",
                    "none",
                ])
                .to_string(),
            "family_conditions" => self.pick(&["heart disease", "cancer", "diabetes"]).to_string(),
            "relative" => self.pick(&["mother", "father", "sibling"]).to_string(),
            "social_factors" => self
                .pick(&[
                    "history of smoking (quit 5 years ago)",
                    "occasional alcohol use",
                    "denies illicit drug use",
                    "lives alone",
                ])
                .to_string(),
            "medications" => self.list(
                &["Lisinopril 10mg", "Metformin 500mg BID", "Albuterol inhaler PRN", "Atorvastatin 20mg"],
                1,
                3,
            ),
            "allergies" => self.pick(&["penicillin (rash)", "NKDA", "seasonal allergies", "shellfish"]).to_string(),
            "bp" => format!("{}/{}", self.rng.random_range(110..=160), self.rng.random_range(70..=95)),
            "hr" => self.rng.random_range(60..=100).to_string(),
            "rr" => self.rng.random_range(14..=20).to_string(),
            "temp" => format!("{:.1}", self.rng.random_range(97.5..101.5)),
            "spo2" => self.rng.random_range(94..=100).to_string(),
            "diagnosis_list" => self.list(
                &[
                    "Acute bronchitis",
                    "Gastritis",
                    "Migraine headache",
                    "Lumbar strain",
                    "Community-acquired pneumonia",
                ],
                1,
                3,
            ),
            "service" => self.pick(&["Medicine", "Observation", "Surgery"]).to_string(),
            "follow_up" => self
                .pick(&["rest and hydration", "return precautions", "taking medications as prescribed"])
                .to_string(),
            "labs_imaging" => self
                .pick(&["CBC, CMP, Troponin", "Chest X-ray", "CT abdomen/pelvis", "Urinalysis", "EKG"])
                .to_string(),
            "specialty" => self.pick(&["Cardiology", "GI", "Neurology", "Pulmonology"]).to_string(),
            "medication_treatment" => self
                .pick(&["IV fluids", "antibiotics", "pain control regimen", "nebulizer treatments"])
                .to_string(),
            "symptomatic_treatment" => self.pick(&["antiemetics", "analgesics", "cough suppressants"]).to_string(),
            "education_topic" => self
                .pick(&["medication side effects", "warning signs", "dietary changes"])
                .to_string(),
            "fup_time" => self.pick(&["2-3 days", "1 week", "as needed"]).to_string(),
            "diff_dx" => self.list(
                &["Pulmonary embolism", "Myocardial infarction", "Appendicitis", "Cholecystitis"],
                1,
                2,
            ),
            other => format!("{{{}}}", other),
        }
    }
}

impl<R: Rng> DocumentSource for MedicalRecordGenerator<R> {
    fn generate_document(&mut self) -> Result<String> {
        Ok(self.generate())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_present() {
        let record = MedicalRecordGenerator::seeded(7).generate();
        for heading in [
            "## Patient Record:",
            "**Chief Complaint:**",
            "**History of Present Illness:**",
            "**Past Medical History:**",
            "**Physical Examination:**",
            "**Assessment and Plan:**",
        ] {
            assert!(record.contains(heading), "missing {}", heading);
        }
    }

    #[test]
    fn test_placeholders_filled() {
        let mut generator = MedicalRecordGenerator::seeded(42);
        for _ in 0..5 {
            let record = generator.generate();
            assert!(!record.contains('{'), "unfilled slot in:\n{}", record);
        }
    }

    #[test]
    fn test_seeded_is_deterministic_apart_from_date() {
        let a = MedicalRecordGenerator::seeded(3).generate();
        let b = MedicalRecordGenerator::seeded(3).generate();
        assert_eq!(a, b);
    }

    #[test]
    fn test_roughly_target_length() {
        let record = MedicalRecordGenerator::seeded(11).word_count(600).generate();
        let words = record.split_whitespace().count();
        assert!(words >= 400, "only {} words", words);
    }

    #[test]
    fn test_exam_is_bulleted() {
        let record = MedicalRecordGenerator::seeded(5).generate();
        let exam = record
            .split("**Physical Examination:**\n")
            .nth(1)
            .and_then(|rest| rest.split("\n\n").next())
            .unwrap();
        assert!(exam.lines().all(|l| l.starts_with("- ")));
        assert!(exam.lines().count() >= 8);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("chest pain"), "Chest pain");
        assert_eq!(capitalize(""), "");
    }
}
