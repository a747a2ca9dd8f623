use crate::models::question::CandidateQuestion;

const TITLE: &str = "{title}";

struct Template {
    question: &'static str,
    options: [&'static str; 4],
    correct: u8,
    explanation: &'static str,
}

const TEMPLATES: &[Template] = &[
    Template {
        question: "What is the primary purpose of studying {title}?",
        options: [
            "To build a structured understanding of its core concepts and their applications",
            "To memorise isolated facts without context",
            "To avoid practical problem solving",
            "To replace all other fields of study",
        ],
        correct: 0,
        explanation: "Studying {title} aims at a structured understanding of its concepts and how they apply.",
    },
    Template {
        question: "Which approach is most effective when learning {title}?",
        options: [
            "Reading the material once without review",
            "Combining conceptual study with regular practice and self-assessment",
            "Focusing only on terminology",
            "Skipping foundational topics",
        ],
        correct: 1,
        explanation: "Durable learning of {title} combines concepts, practice and self-assessment.",
    },
    Template {
        question: "When applying concepts from {title} to a new problem, what should come first?",
        options: [
            "Choosing a solution before understanding the problem",
            "Ignoring the constraints of the situation",
            "Analysing the problem and identifying which concepts are relevant",
            "Copying a previous solution unchanged",
        ],
        correct: 2,
        explanation: "Applying {title} starts with analysing the problem and selecting relevant concepts.",
    },
    Template {
        question: "Which statement best describes the relationship between theory and practice in {title}?",
        options: [
            "Theory and practice are unrelated",
            "Practice makes theory unnecessary",
            "Theory is only useful for examinations",
            "Theory explains why methods work, and practice tests and refines that understanding",
        ],
        correct: 3,
        explanation: "In {title}, theory and practice inform each other.",
    },
    Template {
        question: "How can a learner best verify their understanding of {title}?",
        options: [
            "By explaining key ideas in their own words and solving unfamiliar problems",
            "By re-reading headings only",
            "By relying on recognition of familiar phrases",
            "By avoiding questions they find difficult",
        ],
        correct: 0,
        explanation: "Explaining ideas and solving unfamiliar problems demonstrates real understanding of {title}.",
    },
    Template {
        question: "Why are foundational concepts important in {title}?",
        options: [
            "They are rarely used after the introduction",
            "Advanced topics build on them, so gaps make later material harder to master",
            "They only matter for historical reasons",
            "They can be learned after the advanced material",
        ],
        correct: 1,
        explanation: "Advanced topics in {title} depend on its foundations.",
    },
    Template {
        question: "What is a common mistake when evaluating solutions in {title}?",
        options: [
            "Comparing alternatives against clear criteria",
            "Checking assumptions before drawing conclusions",
            "Accepting the first plausible answer without checking its assumptions",
            "Testing a solution against edge cases",
        ],
        correct: 2,
        explanation: "Unchecked assumptions are a frequent source of error in {title}.",
    },
    Template {
        question: "Which activity best demonstrates mastery of {title}?",
        options: [
            "Listing the chapter titles",
            "Recalling a single definition",
            "Recognising a term when it appears",
            "Combining several concepts to solve a problem not seen before",
        ],
        correct: 3,
        explanation: "Synthesis across concepts on novel problems indicates mastery of {title}.",
    },
    Template {
        question: "How should conflicting information about {title} be handled?",
        options: [
            "By comparing the evidence and reasoning behind each claim",
            "By accepting whichever claim appeared most recently",
            "By ignoring both claims",
            "By choosing the claim that is easiest to remember",
        ],
        correct: 0,
        explanation: "Weighing evidence and reasoning resolves conflicting claims about {title}.",
    },
    Template {
        question: "What role does terminology play in {title}?",
        options: [
            "It has no effect on understanding",
            "Precise terms allow ideas to be communicated and reasoned about without ambiguity",
            "It is only needed for formal writing",
            "It replaces the need to understand concepts",
        ],
        correct: 1,
        explanation: "Precise terminology supports clear reasoning in {title}.",
    },
];

/// Static, content-independent questions used when generation is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackBank;

impl FallbackBank {
    pub fn template_count(&self) -> usize {
        TEMPLATES.len()
    }

    /// `count` questions, cycling through the templates in order.
    pub fn generate(&self, title: &str, count: usize) -> Vec<CandidateQuestion> {
        (0..count)
            .map(|i| render(&TEMPLATES[i % TEMPLATES.len()], title))
            .collect()
    }
}

fn render(t: &Template, title: &str) -> CandidateQuestion {
    CandidateQuestion {
        question: t.question.replace(TITLE, title),
        options: t.options.map(|o| o.replace(TITLE, title)),
        correct_answer_index: t.correct,
        explanation: t.explanation.replace(TITLE, title),
    }
}
