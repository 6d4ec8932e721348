use std::path::{Path, PathBuf};

use crate::errors::TailorError;
use crate::models::{CandidateProfile, GeneratedBullet, JobDescription, TailoredPackage};
use crate::render::RenderSink;

/// `resume.md` with bullets grouped under their source, plus `cover_letter.md`
/// when the package has a letter.
pub struct MarkdownSink;

impl RenderSink for MarkdownSink {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn write(
        &self,
        package: &TailoredPackage,
        job: &JobDescription,
        resume: &CandidateProfile,
        dir: &Path,
    ) -> Result<Vec<PathBuf>, TailorError> {
        let mut written = Vec::new();

        let resume_path = dir.join("resume.md");
        std::fs::write(&resume_path, render_resume(package, job, resume))?;
        written.push(resume_path);

        if let Some(letter) = &package.cover_letter {
            let letter_path = dir.join("cover_letter.md");
            let body = format!(
                "# Cover Letter: {} at {}\n\n{}\n\n{}\n",
                job.title,
                job.company_or_default(),
                letter.text.trim(),
                resume.name
            );
            std::fs::write(&letter_path, body)?;
            written.push(letter_path);
        }

        Ok(written)
    }
}

pub fn render_resume(
    package: &TailoredPackage,
    job: &JobDescription,
    resume: &CandidateProfile,
) -> String {
    let mut out = format!("# {}\n\n", resume.name);

    let contact: Vec<&str> = [
        Some(resume.email.as_str()),
        resume.phone.as_deref(),
        resume.location.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|s| !s.is_empty())
    .collect();
    if !contact.is_empty() {
        out.push_str(&contact.join(" | "));
        out.push_str("\n\n");
    }

    out.push_str(&format!(
        "_Tailored for {} at {}_\n\n",
        job.title,
        job.company_or_default()
    ));

    if let Some(summary) = resume.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        out.push_str(&format!("## Summary\n\n{}\n\n", summary.trim()));
    }

    out.push_str("## Experience\n\n");
    for exp in &resume.experiences {
        let bullets = bullets_for(&package.bullets, &exp.id);
        if bullets.is_empty() {
            continue;
        }
        out.push_str(&format!(
            "### {} at {} ({})\n\n",
            exp.role,
            exp.company,
            exp.date_range()
        ));
        push_bullets(&mut out, &bullets);
    }

    let project_groups: Vec<_> = resume
        .projects
        .iter()
        .map(|p| (p, bullets_for(&package.bullets, &p.id)))
        .filter(|(_, b)| !b.is_empty())
        .collect();
    if !project_groups.is_empty() {
        out.push_str("## Projects\n\n");
        for (project, bullets) in project_groups {
            out.push_str(&format!("### {}\n\n", project.name));
            push_bullets(&mut out, &bullets);
        }
    }

    let orphans: Vec<&GeneratedBullet> = package
        .bullets
        .iter()
        .filter(|b| {
            b.source_experience_id
                .as_deref()
                .map_or(true, |id| !resume.has_source(id))
        })
        .collect();
    if !orphans.is_empty() {
        out.push_str("## Additional highlights\n\n");
        push_bullets(&mut out, &orphans);
    }

    if !resume.skills.is_empty() {
        out.push_str(&format!("## Skills\n\n{}\n\n", resume.skills.join(", ")));
    }

    if !resume.education.is_empty() {
        out.push_str("## Education\n\n");
        for edu in &resume.education {
            match edu.year {
                Some(year) => out.push_str(&format!("- {}, {} ({})\n", edu.degree, edu.institution, year)),
                None => out.push_str(&format!("- {}, {}\n", edu.degree, edu.institution)),
            }
        }
        out.push('\n');
    }

    out
}

fn bullets_for<'a>(bullets: &'a [GeneratedBullet], source_id: &str) -> Vec<&'a GeneratedBullet> {
    bullets
        .iter()
        .filter(|b| b.source_experience_id.as_deref() == Some(source_id))
        .collect()
}

fn push_bullets(out: &mut String, bullets: &[&GeneratedBullet]) {
    for b in bullets {
        out.push_str("- ");
        out.push_str(b.text.trim());
        out.push('\n');
    }
    out.push('\n');
}
