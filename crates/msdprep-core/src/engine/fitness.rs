use super::sweep::SubJob;

const WEIGHT_PLACEHOLDERS: [&str; 2] = ["%(WSCAN)s", "WSCAN"];
const FITNESS_KEYWORD: &str = "FITNESS";
const ENTFUNC_VARIABLE: &str = "entfunc";

/// State-list files available to one species, as `(backbone, file)` pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesStates {
    pub species: String,
    pub states: Vec<(String, String)>,
}

/// Applies one sub-job's weights to a fitness template.
///
/// Comment lines pass through untouched. Every other line has its `WSCAN`
/// placeholder replaced by the dG weight. When an entity function is declared,
/// the `FITNESS` line is preceded by its `ENTITY_FUNCTION` declaration and gains
/// a weighted `entfunc` term.
pub fn apply_weights(template: &str, sub_job: &SubJob, entfunc_name: Option<&str>) -> Vec<String> {
    let weight = format!("{:.6}", sub_job.dg_weight);
    let mut lines = Vec::new();
    for line in template.split_inclusive('\n') {
        if line.starts_with('#') {
            lines.push(line.to_string());
            continue;
        }
        let mut rendered = WEIGHT_PLACEHOLDERS
            .iter()
            .fold(line.to_string(), |acc, placeholder| acc.replace(placeholder, &weight));

        if let Some(name) = entfunc_name.filter(|_| line.starts_with(FITNESS_KEYWORD)) {
            lines.push(format!("ENTITY_FUNCTION {ENTFUNC_VARIABLE} {name}\n"));
            lines.push("\n".to_string());
            rendered = format!(
                "{} + {:.6} * {ENTFUNC_VARIABLE}\n",
                rendered.trim_end_matches(['\n', '\r']),
                sub_job.entity_weight
            );
        }
        lines.push(rendered);
    }
    lines
}

/// Declarations that expose per-backbone state vectors, per-species best
/// energies and per-complex binding energies to a user fitness template.
pub fn backbone_preamble(
    species: &[SpeciesStates],
    backbones: &[&str],
    complexes: &[(&str, &str)],
) -> Vec<String> {
    let names: Vec<&str> = species.iter().map(|s| s.species.as_str()).collect();
    let mut lines = vec![
        format!("# species: {}\n", names.join(" ")),
        format!("# bbnames: {}\n", backbones.join(" ")),
    ];

    for spec in species {
        for (bb, file) in &spec.states {
            lines.push(format!("STATE_VECTOR {}_{bb} {file}\n", spec.species));
        }
        lines.push("\n".to_string());
    }

    for spec in species {
        for (bb, _) in &spec.states {
            let s = &spec.species;
            lines.push(format!("SCALAR_EXPRESSION best_{s}_{bb} = vmin( {s}_{bb})\n"));
        }
        lines.push("\n".to_string());
    }

    lines.push("# best energies for a single species on each of its available backbones\n".to_string());
    for spec in species {
        let bests: Vec<String> = spec
            .states
            .iter()
            .map(|(bb, _)| format!("best_{}_{bb}", spec.species))
            .collect();
        let line = format!("VECTOR_VARIABLE v{} = {}", spec.species, bests.join(" "));
        lines.push(format!("{}\n", line.trim_end()));
    }
    lines.push("\n".to_string());

    for (complex, separated) in complexes {
        lines.push(format!(
            "VECTOR_EXPRESSION FOR c IN v{complex} , s IN v{separated} :  vdGbind_{complex} = ( c - s ) * ite( lt( c - s, 0 ), 1, 0 ) \n"
        ));
    }
    lines.push("\n".to_string());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub_job() -> SubJob {
        SubJob {
            name: "testjob_1.5w_dGdiff_3.25Ent".to_string(),
            dg_weight: 1.5,
            entity_weight: 3.25,
        }
    }

    #[test]
    fn fitness_line_gains_entity_function_term() {
        let template = "# comment with WSCAN\nSCALAR_EXPRESSION best_dGbind = vmax( vdGbind_MH3_MH4 )\nFITNESS best_MH3_MH4 + %(WSCAN)s * best_dGbind\n";
        let lines = apply_weights(template, &sub_job(), Some("entfunc.txt"));

        assert_eq!(lines[0], "# comment with WSCAN\n");
        assert_eq!(lines[2], "ENTITY_FUNCTION entfunc entfunc.txt\n");
        assert_eq!(lines[3], "\n");
        assert_eq!(
            lines.last().unwrap(),
            "FITNESS best_MH3_MH4 + 1.500000 * best_dGbind + 3.250000 * entfunc\n"
        );
    }

    #[test]
    fn bare_placeholder_is_replaced_without_entity_function() {
        let template = "FITNESS X + WSCAN * dG";
        let lines = apply_weights(template, &sub_job(), None);
        assert_eq!(lines, vec!["FITNESS X + 1.500000 * dG".to_string()]);
    }

    #[test]
    fn fitness_line_without_trailing_newline_is_terminated() {
        let lines = apply_weights("FITNESS X", &sub_job(), Some("e"));
        assert_eq!(
            lines,
            vec![
                "ENTITY_FUNCTION entfunc e\n".to_string(),
                "\n".to_string(),
                "FITNESS X + 3.250000 * entfunc\n".to_string(),
            ]
        );
    }

    #[test]
    fn preamble_declares_vectors_bests_and_binding_energies() {
        let species = vec![
            SpeciesStates {
                species: "AB".into(),
                states: vec![
                    ("bb1".into(), "AB_for_bb1.states".into()),
                    ("bb2".into(), "AB_for_bb2.states".into()),
                ],
            },
            SpeciesStates {
                species: "A_p_B".into(),
                states: vec![("bb1".into(), "A_p_B_for_bb1.states".into())],
            },
        ];
        let lines = backbone_preamble(&species, &["bb1", "bb2"], &[("AB", "A_p_B")]);
        let text = lines.concat();

        assert!(text.starts_with("# species: AB A_p_B\n# bbnames: bb1 bb2\n"));
        assert!(text.contains(
            "STATE_VECTOR AB_bb1 AB_for_bb1.states\nSTATE_VECTOR AB_bb2 AB_for_bb2.states\n\nSTATE_VECTOR A_p_B_bb1 A_p_B_for_bb1.states\n\n"
        ));
        assert!(text.contains("SCALAR_EXPRESSION best_AB_bb2 = vmin( AB_bb2)\n"));
        assert!(text.contains("VECTOR_VARIABLE vAB = best_AB_bb1 best_AB_bb2\n"));
        assert!(text.contains("VECTOR_VARIABLE vA_p_B = best_A_p_B_bb1\n"));
        assert!(text.ends_with(
            "VECTOR_EXPRESSION FOR c IN vAB , s IN vA_p_B :  vdGbind_AB = ( c - s ) * ite( lt( c - s, 0 ), 1, 0 ) \n\n"
        ));
    }

    #[test]
    fn species_without_states_gets_an_empty_vector_variable() {
        let species = vec![SpeciesStates {
            species: "X".into(),
            states: vec![],
        }];
        let text = backbone_preamble(&species, &[], &[]).concat();
        assert!(text.contains("VECTOR_VARIABLE vX =\n"));
    }
}
