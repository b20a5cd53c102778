//! Prompt builders for every oracle contract.
//!
//! Prompts describe the task and the scoring anchors; the reply shape is
//! enforced separately through the contract's JSON schema.

use crate::annotation::claims::Claim;
use crate::rubric::SpeechScore;
use crate::transcript::{Speech, Transcript};

const SCORE_ANCHORS: &str = "\
Use the FULL 1-10 scale:
  1-2: poor, incoherent or irrelevant
  3-4: below average, generic or vague
  5:   average, competent but unremarkable
  6:   solid, clear but without distinctive insight
  7:   strong, sharp arguments and persuasive moments
  8:   excellent, real depth and strong evidence
  9:   outstanding on several dimensions
  10:  near-perfect execution";

const NEUTRALITY: &str = "\
You are judging ARGUMENTATIVE SKILL, not whether the motion is true. Either
side of a motion can be argued well or badly. Score the craft, not the
conclusion.";

fn definitions_block(transcript: &Transcript, instruction: &str) -> String {
    let defs = transcript.definitions();
    if defs.is_empty() {
        return String::new();
    }
    format!("\n{}\n\n{}\n", defs, instruction)
}

/// Layer 1: score one speech on five dimensions.
pub fn speech_score(transcript: &Transcript, rendered: &str, speech: &Speech) -> String {
    let defs = definitions_block(
        transcript,
        "When scoring ARGUMENT STRENGTH, consider whether the speaker worked within \
         or explicitly contested the definitional framework.",
    );
    format!(
        "You are an expert debate adjudicator scoring a single speech.\n\n\
         {neutral}\n\n\
         Motion: \"{motion}\"\n{defs}\n\
         Full debate transcript, for context:\n{rendered}\n\n\
         SCORE THIS SPEECH\n\
         Speaker: {speaker} ({side})\n\
         Speech:\n{text}\n\n\
         {anchors}\n\n\
         Dimensions:\n\
         1. argument_strength: are the claims valid, consistent and more than assertion?\n\
         2. rebuttal_quality: does the speaker attack the strongest opposing points, \
            not strawmen? The opening speaker scores 5 here and is judged on pre-emptive framing.\n\
         3. evidence_grounding: is the evidence specific, real and well deployed?\n\
         4. rhetorical_effectiveness: is the speech structured, clear and compelling?\n\
         5. persona_fidelity: does the speaker keep one consistent, distinctive voice \
            and line of argument from start to finish?\n\n\
         Also give an overall score (1-10) that is NOT a plain average: weight argument \
         strength and rhetoric most, then rebuttal. Add a 2-3 sentence rationale.\n\
         Not every speech in a debate is equally good; differentiate.",
        neutral = NEUTRALITY,
        motion = transcript.motion,
        defs = defs,
        rendered = rendered,
        speaker = speech.speaker,
        side = speech.side.label(),
        text = speech.text,
        anchors = SCORE_ANCHORS,
    )
}

/// Layer 1: force-rank clustered scores.
pub fn recalibration(transcript: &Transcript, rendered: &str, scores: &[SpeechScore]) -> String {
    let n = scores.len();
    let scores_block = scores
        .iter()
        .map(|s| {
            format!(
                "  {} ({}): overall={:.1} [arg={:.0} reb={:.0} ev={:.0} rhet={:.0} persona={:.0}]",
                s.speaker,
                s.side.label(),
                s.overall,
                s.argument_strength,
                s.rebuttal_quality,
                s.evidence_grounding,
                s.rhetorical_effectiveness,
                s.persona_fidelity,
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let defs = definitions_block(transcript, "Keep this framework in mind when ranking.");

    format!(
        "You are a chief adjudicator. An initial panel scored each of the {n} speeches \
         independently, but the scores CLUSTERED. Recalibrate by comparing the speeches \
         directly.\n\n\
         Motion: \"{motion}\"\n{defs}\n\
         Full debate transcript:\n{rendered}\n\n\
         INITIAL SCORES:\n{scores_block}\n\n\
         1. Force-rank all {n} speeches from 1 (best) to {n} (worst). Every rank is \
            used exactly once; no ties.\n\
         2. Reassign all five dimensions and the overall score so that the best and \
            worst overall differ by at least 2.0 points and at least 3 distinct integer \
            overall values are used. A 10 should almost never appear.\n\
         3. Give each speaker a 1-2 sentence comparative rationale.\n\n\
         The opening speaker has nothing to rebut and scores 5 on rebuttal. Later \
         speakers who ignore preceding arguments score low on rebuttal. Repeating a \
         teammate is worse than advancing new points. Judge individuals, not sides.\n\
         Use each speaker_name exactly as written above.",
        n = n,
        motion = transcript.motion,
        defs = defs,
        rendered = rendered,
        scores_block = scores_block,
    )
}

/// Layer 2a, step 1: extract and classify claims.
pub fn claim_extraction(transcript: &Transcript, rendered: &str) -> String {
    let roster = transcript
        .ordered_speeches()
        .iter()
        .map(|s| {
            format!(
                "  slot {}: {} ({}) -> ids {}_{}_a, {}_{}_b, ...",
                s.position,
                s.speaker,
                s.side,
                s.side.short_label(),
                s.position,
                s.side.short_label(),
                s.position
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let defs = definitions_block(
        transcript,
        "Note where speakers argue within or against this framework.",
    );

    format!(
        "You are a debate annotator. Your job is FACTUAL ANNOTATION, not judgment; you \
         have no opinion on the motion.\n\n\
         Motion: \"{motion}\"\n{defs}\n\
         Full debate transcript:\n{rendered}\n\n\
         Speaking order:\n{roster}\n\n\
         Extract every distinct substantive claim made by each speaker. Ignore \
         pleasantries and pure rhetoric. For each claim give:\n\
         - claim_id: \"{{side}}_{{slot}}_{{letter}}\" where slot is the speaking slot above\n\
         - speaker_name, exactly as written above\n\
         - side: \"proposition\" or \"opposition\"\n\
         - claim_text: a neutral 1-2 sentence summary\n\
         - claim_type: \"evidence_backed\" (NAMED evidence: data, studies, cases, \
           institutions), \"principled\" (reasoning or ethical frameworks without \
           empirical evidence) or \"assertion\" (stated as fact without support). \
           \"Studies show\" without naming a study is an assertion.\n\
         - specificity: \"specific\" (particular data, cases or people only a domain \
           expert would cite) or \"generic\"\n\n\
         Extract from both sides equally. One claim per distinct point; aim for 3-6 per \
         speaker.",
        motion = transcript.motion,
        defs = defs,
        rendered = rendered,
        roster = roster,
    )
}

/// Layer 2a, step 2: map cross-side rebuttals onto the claim list.
pub fn rebuttal_mapping(transcript: &Transcript, rendered: &str, claims: &[Claim]) -> String {
    let claims_list = claims
        .iter()
        .map(|c| {
            format!(
                "  [{}] {} ({}): {} [{}, {}]",
                c.id, c.speaker, c.side, c.summary, c.claim_type, c.specificity
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let defs = definitions_block(
        transcript,
        "Note whether rebuttals engage within the agreed framework or contest it.",
    );

    format!(
        "You are a debate annotator. Your job is FACTUAL ANNOTATION, not judgment.\n\n\
         Motion: \"{motion}\"\n{defs}\n\
         Full debate transcript:\n{rendered}\n\n\
         Claims extracted from the debate:\n{claims_list}\n\n\
         For each claim addressed by a later speaker from the OTHER side, create a \
         rebuttal annotation. Look in BOTH directions: Opposition rebutting Proposition \
         claims and Proposition rebutting Opposition claims. If you only find rebuttals \
         flowing one way you have missed some.\n\n\
         For each rebuttal give:\n\
         - target_claim_id: one of the ids above\n\
         - rebutting_speaker, exactly as named in the transcript\n\
         - rebuttal_summary: neutral, 1-2 sentences\n\
         - engagement_level: \"direct\" (engages the claim's specific logic or \
           evidence), \"indirect\" (the general theme only) or \"strawman\"\n\
         - method: \"counter_evidence\", \"logical_flaw\", \"counter_example\" or \
           \"reassertion\" (restating the opposing position; weakest)\n\
         - addresses_specific_logic: does it engage the claim's actual reasoning chain?\n\
         - provides_new_information: does it add evidence, an example or analysis the \
           original speaker had not already addressed?\n\
         - undermines_original: would a reasonable listener now give the claim \
           significantly less weight? False if the rebuttal misses, strawmans or merely \
           reasserts.\n\n\
         The three yes/no questions are independent. Only cross-side rebuttals count. \
         Apply the same standard to both sides.",
        motion = transcript.motion,
        defs = defs,
        rendered = rendered,
        claims_list = claims_list,
    )
}

/// Layer 2b: one judge's comparative vote on an anonymized transcript.
///
/// `definitions` must already be anonymized with the same pass mapping as
/// the transcript.
pub fn engagement_vote(motion: &str, definitions: &str, anonymized: &str) -> String {
    let defs = if definitions.trim().is_empty() {
        String::new()
    } else {
        format!(
            "\n{}\n\nJudge engagement within this framework, or credit a team that \
             contested it convincingly.\n",
            definitions
        )
    };
    format!(
        "You are an expert debate adjudicator. The speakers have been ANONYMIZED: the \
         two teams are labelled \"Team A\" and \"Team B\" and you do not know which \
         side proposed the motion.\n\n\
         Motion: \"{motion}\"\n{defs}\n\
         ANONYMIZED DEBATE TRANSCRIPT:\n{anonymized}\n\n\
         Criteria, in order of weight:\n\
         1. Engagement with opposing arguments (40%): which team grappled with the \
            other's strongest points instead of talking past them?\n\
         2. Argument quality (30%): structure, logic, evidence. One devastating \
            argument beats five weak assertions.\n\
         3. Rebuttal effectiveness (20%): which rebuttals actually landed?\n\
         4. Coherent narrative (10%): did the team's case build across its speeches?\n\n\
         Your views on the motion are irrelevant. Do not reward a team for advocating \
         caution or the status quo, nor penalize a bold position. Relying on \"what if \
         it goes wrong\" without engaging specific evidence is a weakness; so is listing \
         benefits without answering specific concerns.\n\n\
         Identify each team's strongest argument, the best rebuttal, and the decisive \
         moment, then decide which team argued better.\n\
         - better_team: \"Team A\" or \"Team B\"\n\
         - engagement_quality_a / engagement_quality_b: 1-10\n\
         - key_reason: must cite SPECIFIC arguments and exchanges\n\
         - confidence: 0.0 means too close to call, 1.0 unambiguous",
        motion = motion,
        defs = defs,
        anonymized = anonymized,
    )
}

/// Layer 3: structural audit of claim survival.
pub fn audit(transcript: &Transcript, rendered: &str) -> String {
    let defs = definitions_block(
        transcript,
        "Track whether claims operate within or against this framework.",
    );
    format!(
        "You are a forensic debate analyst. Perform a purely structural analysis of \
         the argument flow. A claim is strong if it was well argued and survived \
         challenge, whether or not you find it comfortable.\n\n\
         Motion: \"{motion}\"\n{defs}\n\
         Full debate transcript:\n{rendered}\n\n\
         1. Identify every distinct substantive claim by each speaker.\n\
         2. For each: was it rebutted, and by whom? Did the rebuttal succeed with a \
            specific counter-argument, or merely reassert? Does the claim survive?\n\
         3. Count surviving claims per side.\n\
         4. List 2-4 key uncontested claims, from both sides.\n\
         5. List 2-4 key demolished claims, from both sides.\n\
         6. Name the structural winner: the side with more surviving claims, weighted \
            by importance.\n\
         7. Write a 2-3 sentence structural summary: who set the agenda, where the \
            debate shifted, how it ended.\n\n\
         Vague appeals to risk do not demolish specific empirical claims, and citing a \
         benefit does not demolish a specific risk argument. Most contested claims are \
         not decisively demolished.",
        motion = transcript.motion,
        defs = defs,
        rendered = rendered,
    )
}
