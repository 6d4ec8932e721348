use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::TailorError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experience {
    pub id: String,
    pub role: String,
    pub company: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub bullets: Vec<String>,
}

impl Experience {
    pub fn date_range(&self) -> String {
        format!(
            "{} - {}",
            self.start_date.as_deref().unwrap_or("N/A"),
            self.end_date.as_deref().unwrap_or("Present")
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Education {
    pub degree: String,
    pub institution: String,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub details: Vec<String>,
}

/// The candidate's full resume, the only source of truth for generated claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub candidate_id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experiences: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub projects: Vec<Project>,
}

/// Where a bullet or retrieved evidence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Experience,
    Project,
}

impl CandidateProfile {
    pub fn experience(&self, id: &str) -> Option<&Experience> {
        self.experiences.iter().find(|e| e.id == id)
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// True when `id` names an experience or a project of this candidate.
    pub fn has_source(&self, id: &str) -> bool {
        self.experience(id).is_some() || self.project(id).is_some()
    }

    /// Human label for a source id: "Role at Company" or "Project: Name".
    pub fn source_label(&self, id: &str) -> Option<String> {
        if let Some(exp) = self.experience(id) {
            return Some(format!("{} at {}", exp.role, exp.company));
        }
        self.project(id).map(|p| format!("Project: {}", p.name))
    }

    /// Every original bullet in resume order: experiences first, then projects.
    pub fn all_bullets(&self) -> Vec<(&str, SourceType, &str)> {
        let experience_bullets = self.experiences.iter().flat_map(|e| {
            e.bullets
                .iter()
                .map(move |b| (e.id.as_str(), SourceType::Experience, b.as_str()))
        });
        let project_bullets = self.projects.iter().flat_map(|p| {
            p.bullets
                .iter()
                .map(move |b| (p.id.as_str(), SourceType::Project, b.as_str()))
        });
        experience_bullets.chain(project_bullets).collect()
    }

    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.iter().any(|s| s.eq_ignore_ascii_case(skill.trim()))
    }
}

pub fn load_resume(path: &Path) -> Result<CandidateProfile, TailorError> {
    let resume: CandidateProfile = super::load_document(path)?;
    if resume.experiences.is_empty() && resume.projects.is_empty() {
        return Err(TailorError::InvalidInput(format!(
            "{}: resume has no experiences or projects",
            path.display()
        )));
    }
    Ok(resume)
}
