// Ingestion LLM prompt templates.

pub const JOB_PARSE_ROLE: &str = "\
You are a job description parser that converts job postings into a strict JSON schema. \
Required skills are those stated as required, must-have, or listed under requirements. \
Nice-to-have skills are those stated as preferred, bonus, or nice to have. \
Use null for fields that cannot be determined from the text.";

pub const JOB_PARSE_PROMPT: &str = r#"Parse the following job description into the JSON schema below.

JOB DESCRIPTION:
---
{raw_text}
---

OUTPUT SCHEMA (return exactly this structure):
{
  "job_id": "company-and-role slug, e.g. acme-ml-engineer",
  "title": "Job Title",
  "company": "Company Name" | null,
  "location": "City, Country or Remote" | null,
  "seniority": "Entry" | "Mid" | "Senior" | "Lead" | "Principal" | null,
  "responsibilities": ["Key responsibility"],
  "required_skills": ["Required skill"],
  "nice_to_have_skills": ["Preferred skill"],
  "extra_metadata": {"salary_range": "...", "employment_type": "...", "remote_policy": "..."}
}{retry_block}"#;

pub const RESUME_PARSE_ROLE: &str = "\
You are a resume parser that converts human resumes into a strict JSON schema. \
Extract every skill mentioned anywhere in the resume. \
Assign experience ids exp-001, exp-002, ... and project ids proj-001, proj-002, ... in order. \
Use null for missing optional fields and for the end_date of a current position.";

pub const RESUME_PARSE_PROMPT: &str = r#"Parse the following resume into the JSON schema below.

RESUME:
---
{raw_text}
---

OUTPUT SCHEMA (return exactly this structure):
{
  "candidate_id": "name-based slug, e.g. jane-doe",
  "name": "Full Name",
  "email": "email@example.com",
  "phone": "+1-555-0123" | null,
  "location": "City, Country" | null,
  "summary": "Professional summary" | null,
  "skills": ["Skill"],
  "experiences": [
    {
      "id": "exp-001",
      "role": "Job Title",
      "company": "Company Name",
      "location": "City" | null,
      "start_date": "YYYY-MM" | null,
      "end_date": "YYYY-MM" | null,
      "bullets": ["Accomplishment"]
    }
  ],
  "education": [
    {"degree": "Degree", "institution": "School", "year": 2020 | null, "details": ["Honors"]}
  ],
  "projects": [
    {
      "id": "proj-001",
      "name": "Project Name",
      "description": "One line" | null,
      "tech_stack": ["Technology"],
      "bullets": ["Accomplishment"]
    }
  ]
}{retry_block}"#;

pub const RETRY_INSTRUCTION: &str = "\n\n\
Your previous response was not valid JSON for this schema. \
Return ONLY a valid JSON object matching the schema, with no additional text, markdown, or explanations.";
