//! System prompts and template builders for agents.
//!
//! System prompts define each agent's role and can be overridden with
//! markdown files. Template builders format the per-call user messages; they
//! are pure functions of their inputs (the date is passed in) so they can be
//! tested without a clock.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};

use super::state::SectionDraft;
use crate::core::Language;

/// System prompt for the editor (planning) agent.
pub const EDITOR_SYSTEM_PROMPT: &str = "You are a research editor. Your goal is to oversee the research project from inception to completion. Your main task is to plan the article section layout based on an initial research summary.";

/// Chinese system prompt for the editor agent.
pub const EDITOR_SYSTEM_PROMPT_ZH: &str =
    "你是一名研究编辑。你的目标是监督研究项目从开始到完成。你的主要任务是根据初步研究总结来规划文章的章节布局。";

/// System prompt for the research agent.
pub const RESEARCHER_SYSTEM_PROMPT: &str = r"You are an AI critical thinker research assistant. Your sole purpose is to write well written, critically acclaimed, objective and structured reports on given text.

## Rules

- Ground every claim in the research material or well-established knowledge. Do not fabricate sources.
- Cite sources as markdown hyperlinks next to the claims they support.
- Prefer reliable, recent sources and say so when sources disagree.
- Write in markdown. Use headers for structure and tables where they help.";

/// Chinese system prompt for the research agent.
pub const RESEARCHER_SYSTEM_PROMPT_ZH: &str = r"你是一名具有批判性思维的 AI 研究助理。你的唯一目的是就给定文本撰写写得好、广受好评、客观且结构清晰的报告。

## 规则

- 每个论点都必须有研究材料或公认知识作为依据。不要捏造来源。
- 在其支持的论点旁边以 markdown 超链接的形式引用来源。
- 优先使用可靠、最新的来源，来源之间有分歧时要指出。
- 使用 markdown 撰写。使用标题组织结构，必要时使用表格。";

/// System prompt for the reviewer agent.
pub const REVIEWER_SYSTEM_PROMPT: &str = "You are an expert research article reviewer. Your goal is to review research drafts and provide feedback to the reviser only based on specific guidelines.";

/// Chinese system prompt for the reviewer agent.
pub const REVIEWER_SYSTEM_PROMPT_ZH: &str =
    "你是一名研究文章审稿专家。你的目标是根据特定的指南审查研究草稿并向修订者提供反馈。";

/// System prompt for the reviser agent.
pub const REVISER_SYSTEM_PROMPT: &str = "You are an expert writer. Your goal is to revise drafts based on reviewer notes.";

/// Chinese system prompt for the reviser agent.
pub const REVISER_SYSTEM_PROMPT_ZH: &str = "你是一名专业作者。你的目标是根据审稿人的意见修订草稿。";

/// System prompt for the writer agent.
pub const WRITER_SYSTEM_PROMPT: &str = "You are a research writer. Your sole purpose is to write a well-written research report about a topic based on research findings and information.";

/// Chinese system prompt for the writer agent.
pub const WRITER_SYSTEM_PROMPT_ZH: &str =
    "你是一名研究写作者。你的唯一目的是根据研究结果和信息撰写一份写得很好的研究报告。";

/// Default prompt directory under user config.
const DEFAULT_PROMPT_DIR: &str = ".config/dossier/prompts";

/// Prompt roles, in the order files are written.
const ROLES: [Role; 5] = [
    Role::Editor,
    Role::Researcher,
    Role::Reviewer,
    Role::Reviser,
    Role::Writer,
];

#[derive(Debug, Clone, Copy)]
enum Role {
    Editor,
    Researcher,
    Reviewer,
    Reviser,
    Writer,
}

impl Role {
    const fn stem(self) -> &'static str {
        match self {
            Self::Editor => "editor",
            Self::Researcher => "researcher",
            Self::Reviewer => "reviewer",
            Self::Reviser => "reviser",
            Self::Writer => "writer",
        }
    }

    /// `editor.md` for English, `editor.zh.md` for Chinese.
    fn filename(self, language: Language) -> String {
        match language {
            Language::En => format!("{}.md", self.stem()),
            Language::Zh => format!("{}.zh.md", self.stem()),
        }
    }

    const fn default_prompt(self, language: Language) -> &'static str {
        match (self, language) {
            (Self::Editor, Language::En) => EDITOR_SYSTEM_PROMPT,
            (Self::Editor, Language::Zh) => EDITOR_SYSTEM_PROMPT_ZH,
            (Self::Researcher, Language::En) => RESEARCHER_SYSTEM_PROMPT,
            (Self::Researcher, Language::Zh) => RESEARCHER_SYSTEM_PROMPT_ZH,
            (Self::Reviewer, Language::En) => REVIEWER_SYSTEM_PROMPT,
            (Self::Reviewer, Language::Zh) => REVIEWER_SYSTEM_PROMPT_ZH,
            (Self::Reviser, Language::En) => REVISER_SYSTEM_PROMPT,
            (Self::Reviser, Language::Zh) => REVISER_SYSTEM_PROMPT_ZH,
            (Self::Writer, Language::En) => WRITER_SYSTEM_PROMPT,
            (Self::Writer, Language::Zh) => WRITER_SYSTEM_PROMPT_ZH,
        }
    }
}

/// System prompts for every agent, in one language.
///
/// Loaded from external template files when available, falling back to
/// compiled-in defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    /// Editor (planner) system prompt.
    pub editor: String,
    /// Research agent system prompt.
    pub researcher: String,
    /// Reviewer system prompt.
    pub reviewer: String,
    /// Reviser system prompt.
    pub reviser: String,
    /// Writer system prompt.
    pub writer: String,
}

impl PromptSet {
    /// Loads prompts for `language`, falling back to compiled-in defaults.
    ///
    /// Resolution order for the directory:
    /// 1. Explicit `prompt_dir` (from `--prompt-dir` or `DOSSIER_PROMPT_DIR`)
    /// 2. `~/.config/dossier/prompts/`
    ///
    /// Each file is loaded independently; a missing file uses its default.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>, language: Language) -> Self {
        let resolved_dir = prompt_dir.map(PathBuf::from).or_else(Self::default_dir);

        let load_file = |role: Role| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(role.filename(language)))
                .and_then(|path| std::fs::read_to_string(&path).ok())
                .filter(|content| !content.trim().is_empty())
                .unwrap_or_else(|| role.default_prompt(language).to_string())
        };

        Self {
            editor: load_file(Role::Editor),
            researcher: load_file(Role::Researcher),
            reviewer: load_file(Role::Reviewer),
            reviser: load_file(Role::Reviser),
            writer: load_file(Role::Writer),
        }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults(language: Language) -> Self {
        Self {
            editor: Role::Editor.default_prompt(language).to_string(),
            researcher: Role::Researcher.default_prompt(language).to_string(),
            reviewer: Role::Reviewer.default_prompt(language).to_string(),
            reviser: Role::Reviser.default_prompt(language).to_string(),
            writer: Role::Writer.default_prompt(language).to_string(),
        }
    }

    /// Writes the compiled-in default prompts, both languages, to `dir`.
    ///
    /// Creates the directory if needed. Existing files are **not**
    /// overwritten. Returns the paths actually written.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let mut written = Vec::new();
        for language in [Language::En, Language::Zh] {
            for role in ROLES {
                let path = dir.join(role.filename(language));
                if !path.exists() {
                    std::fs::write(&path, role.default_prompt(language))?;
                    written.push(path);
                }
            }
        }

        Ok(written)
    }

    /// Returns the default prompt directory under the user's home.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }
}

/// Formats a date the way prompts and report headers show it (`dd/mm/YYYY`).
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Today's date in prompt format.
#[must_use]
pub fn today() -> String {
    format_date(Local::now().date_naive())
}

/// Joins guidelines the way reviewers and writers receive them.
#[must_use]
pub fn join_guidelines(guidelines: &[String]) -> String {
    guidelines.join("- ")
}

/// Builds the planner's user message.
///
/// `human_feedback` is only included when present; callers pass `None`
/// when the task does not ask for feedback.
#[must_use]
pub fn build_plan_prompt(
    language: Language,
    date: &str,
    initial_research: &str,
    human_feedback: Option<&str>,
    max_sections: usize,
) -> String {
    match language {
        Language::En => {
            let feedback = human_feedback.map_or_else(String::new, |f| {
                format!(
                    "Human feedback: {f}. You must plan the sections based on the human feedback.\n"
                )
            });
            format!(
                "Today's date is {date}\n\
                 Research summary report: '{initial_research}'\n\
                 {feedback}\n\
                 Your task is to generate an outline of sections headers for the research project \
                 based on the research summary report above.\n\
                 You must generate a maximum of {max_sections} section headers.\n\
                 You must focus ONLY on related research topics for subheaders and do NOT include \
                 introduction, conclusion and references.\n\
                 You must return nothing but a JSON with the fields 'title' (str), 'date' (str) and \
                 'sections' (maximum {max_sections} section headers) with the following structure:\n\
                 {{\"title\": \"research title\", \"date\": \"{date}\", \
                 \"sections\": [\"section header 1\", \"section header 2\", \"section header 3\"]}}"
            )
        }
        Language::Zh => {
            let feedback = human_feedback.map_or_else(String::new, |f| {
                format!("用户反馈: {f}。你必须根据用户反馈来规划章节。\n")
            });
            format!(
                "今天的日期是 {date}\n\
                 研究总结报告: '{initial_research}'\n\
                 {feedback}\n\
                 你的任务是根据上述研究总结报告生成研究项目的章节标题大纲。\n\
                 你最多可以生成 {max_sections} 个章节标题。\n\
                 你必须只专注于相关的研究主题作为子标题，不要包括引言、结论和参考文献。\n\
                 你必须只返回一个 JSON，其中包含字段 'title'（字符串）、'date'（字符串）和 \
                 'sections'（最多 {max_sections} 个章节标题），结构如下：\n\
                 {{\"title\": \"研究标题\", \"date\": \"{date}\", \
                 \"sections\": [\"章节标题 1\", \"章节标题 2\", \"章节标题 3\"]}}"
            )
        }
    }
}

/// Builds the reviewer's user message.
///
/// When `revision_notes` is present the reviewer is told the draft was
/// already revised and asked to accept unless problems are critical.
#[must_use]
pub fn build_review_prompt(
    language: Language,
    guidelines: &str,
    draft: &str,
    revision_notes: Option<&str>,
) -> String {
    match language {
        Language::En => {
            let revised = revision_notes.map_or_else(String::new, |notes| {
                format!(
                    "The reviser has already revised the draft based on your previous review notes \
                     with the following feedback:\n{notes}\n\n\
                     Please provide additional feedback ONLY if critical since the reviser has \
                     already made changes based on your previous feedback.\n\
                     If you think the article is sufficient or that non critical revisions are \
                     required, please aim to accept it.\n"
                )
            });
            format!(
                "You have been tasked with reviewing the draft which was written by a non-expert \
                 based on specific guidelines.\n\
                 Please accept the draft if it is good enough to publish, or send it for revision, \
                 along with your notes to guide the revision.\n\
                 If not all of the guideline criteria are met, you should send appropriate revision notes.\n\
                 {revised}\n\
                 Return nothing but a JSON object: {{\"accepted\": true, \"notes\": null}} to accept, \
                 or {{\"accepted\": false, \"notes\": \"revision notes\"}} to request a revision.\n\n\
                 Guidelines: {guidelines}\n\
                 Draft: {draft}\n"
            )
        }
        Language::Zh => {
            let revised = revision_notes.map_or_else(String::new, |notes| {
                format!(
                    "修订者已经根据你之前的审查意见对草稿进行了修订，反馈如下：\n{notes}\n\n\
                     请仅在关键情况下提供额外反馈，因为修订者已经根据你之前的反馈进行了更改。\n\
                     如果你认为文章已经足够好或者只需要非关键性的修订，请尽量接受草稿。\n"
                )
            });
            format!(
                "你被要求审查一篇由非专家根据特定指南撰写的草稿。\n\
                 如果草稿足够好可以发表，请接受草稿，或者发送修订意见以指导修订。\n\
                 如果没有满足所有的指南标准，你应该发送适当的修订意见。\n\
                 {revised}\n\
                 只返回一个 JSON 对象：接受时返回 {{\"accepted\": true, \"notes\": null}}，\
                 需要修订时返回 {{\"accepted\": false, \"notes\": \"修订意见\"}}。\n\n\
                 指南: {guidelines}\n\
                 草稿: {draft}\n"
            )
        }
    }
}

/// Builds the reviser's user message.
#[must_use]
pub fn build_revise_prompt(language: Language, draft: &str, review_notes: &str) -> String {
    match language {
        Language::En => format!(
            "Draft:\n{draft}\n\n\
             Reviewer's notes:\n{review_notes}\n\n\
             You have been tasked by your reviewer with revising the following draft, which was \
             written by a non-expert.\n\
             If you decide to follow the reviewer's notes, please write a new draft and make sure \
             to address all of the points they raised.\n\
             Please keep all other aspects of the draft the same.\n\
             You MUST return nothing but a JSON in the following format:\n\
             {{\"draft\": \"the revised draft\", \"revision_notes\": \"your message to the reviewer \
             about the changes you made to the draft based on their feedback\"}}"
        ),
        Language::Zh => format!(
            "草稿:\n{draft}\n\n\
             审稿人意见:\n{review_notes}\n\n\
             审稿人要求你修订以下由非专家撰写的草稿。\n\
             如果你决定采纳审稿人的意见，请撰写新的草稿，并确保回应其提出的所有问题。\n\
             请保持草稿的其他方面不变。\n\
             你必须只返回以下格式的 JSON：\n\
             {{\"draft\": \"修订后的草稿\", \"revision_notes\": \"你给审稿人的说明，描述你根据其反馈对草稿所做的修改\"}}"
        ),
    }
}

/// Describes the writer's JSON layout. Keys are the same in every language.
fn layout_sample(language: Language) -> &'static str {
    match language {
        Language::En => {
            r#"{
  "table_of_contents": "A table of contents in markdown syntax (using '-') based on the research headers and subheaders",
  "introduction": "An indepth introduction to the topic in markdown syntax and hyperlink references to relevant sources",
  "conclusion": "A conclusion to the entire research based on all research data in markdown syntax and hyperlink references to relevant sources",
  "sources": ["- Title, year, Author [source url](source)", "..."]
}"#
        }
        Language::Zh => {
            r#"{
  "table_of_contents": "基于研究标题和副标题的 markdown 语法目录（使用 '-'）",
  "introduction": "对主题的深入介绍，使用 markdown 语法和超链接引用相关来源",
  "conclusion": "基于所有研究数据的整个研究的结论，使用 markdown 语法和超链接引用相关来源",
  "sources": ["- 标题, 年份, 作者 [来源网址](来源)", "..."]
}"#
        }
    }
}

/// Builds the writer's user message from the accepted section drafts.
///
/// Sections whose research failed are left out of the research data.
#[must_use]
pub fn build_writer_prompt(
    language: Language,
    date: &str,
    query: &str,
    sections: &[SectionDraft],
    guidelines: Option<&str>,
) -> String {
    let mut data = String::new();
    for section in sections {
        if let Some(content) = &section.content {
            let _ = write!(
                data,
                "<section topic=\"{topic}\">\n{content}\n</section>\n",
                topic = section.topic
            );
        }
    }
    let sample = layout_sample(language);

    match language {
        Language::En => {
            let guidelines = guidelines.map_or_else(String::new, |g| {
                format!("You must follow the guidelines provided: {g}\n")
            });
            format!(
                "Today's date is {date}.\n\
                 Query or Topic: {query}\n\
                 Research data:\n{data}\n\
                 Your task is to write an in depth, well written and detailed introduction and \
                 conclusion to the research report based on the provided research data. \
                 Do not include headers in the results.\n\
                 You MUST include any relevant sources to the introduction and conclusion as \
                 markdown hyperlinks. For example: 'This is a sample text. ([url website](url))'\n\n\
                 {guidelines}\
                 You MUST return nothing but a JSON in the following format (without json markdown):\n\
                 {sample}\n"
            )
        }
        Language::Zh => {
            let guidelines = guidelines
                .map_or_else(String::new, |g| format!("你必须遵循提供的指南: {g}\n"));
            format!(
                "今天的日期是 {date}。\n\
                 查询或主题: {query}\n\
                 研究数据:\n{data}\n\
                 你的任务是根据提供的研究数据撰写一份深入、写得很好且详细的研究报告的介绍和结论。\
                 不要在结果中包含标题。\n\
                 你必须将任何相关来源作为 markdown 超链接包含在介绍和结论中。\
                 例如：'这是一个示例文本。 ([网址](url))'\n\n\
                 {guidelines}\
                 你必须只返回以下格式的 JSON（不带 json markdown，字段名保持英文）：\n\
                 {sample}\n"
            )
        }
    }
}

/// Builds the writer's header-revision message.
#[must_use]
pub fn build_revise_headers_prompt(language: Language, guidelines: &str, headers_json: &str) -> String {
    match language {
        Language::En => format!(
            "Your task is to revise the given headers JSON based on the guidelines given.\n\
             You are to follow the guidelines but the values should be in simple strings, \
             ignoring all markdown syntax.\n\
             You must return nothing but a JSON in the same format as given in headers data.\n\
             Guidelines: {guidelines}\n\n\
             Headers Data: {headers_json}\n"
        ),
        Language::Zh => format!(
            "你的任务是根据给定的指南修改给定的标题 JSON。\n\
             你必须遵循指南，但值应为简单字符串，忽略所有 markdown 语法。\n\
             你必须只返回与标题数据中给出的格式相同的 JSON。\n\
             指南: {guidelines}\n\n\
             标题数据: {headers_json}\n"
        ),
    }
}

/// Builds the message asking for search query variants.
#[must_use]
pub fn build_subquery_prompt(
    query: &str,
    parent_query: Option<&str>,
    max_queries: usize,
    date: &str,
) -> String {
    let task = parent_query.map_or_else(
        || query.to_string(),
        |parent| format!("{parent} - {query}"),
    );
    format!(
        "Write {max_queries} google search queries to search online that form an objective \
         opinion from the following task: \"{task}\"\n\
         Assume the current date is {date} if required.\n\
         You must respond with a JSON object of the form {{\"queries\": [\"query 1\", \"query 2\", \"query 3\"]}}."
    )
}

/// Inputs for a research writing call.
#[derive(Debug, Clone, Copy)]
pub struct ResearchPromptArgs<'a> {
    /// Query or subtopic being researched.
    pub query: &'a str,
    /// Main topic, for subtopic reports.
    pub parent_query: Option<&'a str>,
    /// Search angles generated for the query.
    pub angles: &'a [String],
    /// Where sources should come from (`web`, `local`, `hybrid`).
    pub source: &'a str,
    /// Requested writing tone.
    pub tone: Option<&'a str>,
    /// Report language.
    pub language: Language,
    /// Prompt date.
    pub date: &'a str,
}

/// Builds the message asking for a markdown research report.
///
/// With a parent query the report covers a single subtopic and must not
/// repeat an introduction or conclusion.
#[must_use]
pub fn build_research_prompt(args: &ResearchPromptArgs<'_>) -> String {
    let mut angles = String::new();
    for angle in args.angles {
        let _ = writeln!(angles, "- {angle}");
    }
    let tone = args.tone.map_or_else(String::new, |t| {
        format!("You must write the report with the following tone: {t}.\n")
    });
    let language = args.language.english_name();
    let source = args.source;

    match args.parent_query {
        None => format!(
            "Research angles:\n{angles}\n\
             Using the angles above and the {source} sources you know of, answer the following \
             query or task: \"{query}\" in a detailed report.\n\
             The report should focus on the answer to the query, should be well structured, \
             informative, in depth and comprehensive, with facts and numbers if available.\n\
             You must determine your own concrete and valid opinion based on the given \
             information. Do NOT defer to general and meaningless conclusions.\n\
             You MUST write all used source urls at the end of the report as references in APA format.\n\
             {tone}\
             You must write the report in {language}.\n\
             Assume that the current date is {date}.",
            query = args.query,
            date = args.date,
        ),
        Some(parent) => format!(
            "Research angles:\n{angles}\n\
             Construct a detailed report on the subtopic: \"{query}\" under the main topic: \
             \"{parent}\".\n\
             The report should focus on the subtopic only, be well structured and in depth, \
             with facts and numbers if available.\n\
             Use markdown, starting with a second level header naming the subtopic.\n\
             Do NOT include an introduction, conclusion or reference list; those are written \
             separately. Cite {source} sources inline as markdown hyperlinks.\n\
             {tone}\
             You must write the report in {language}.\n\
             Assume that the current date is {date}.",
            query = args.query,
            date = args.date,
        ),
    }
}
