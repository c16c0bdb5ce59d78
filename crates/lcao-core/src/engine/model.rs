use super::config::ModelConfig;
use super::embedding::{EmbedCoeffs, EmbedElec, EmbedNode, EmbedZ, ValenceMask};
use super::error::EngineError;
use super::interaction::{InteractionInputs, LcaoInteraction};
use super::output::{LcaoOut, PostProcess, Reduction};
use crate::core::basis::{
    AngularBasis, CutoffFunction, RadialBasis, SphericalHarmonicsBasis,
};
use crate::core::elements::ElecInfo;
use crate::core::graph::triplets::Triplets;
use crate::core::models::graph::{AtomGraph, Batch};
use crate::core::nn::OrbitalTensor;
use crate::core::utils::geometry::{EdgeGeometry, edge_geometry, triplet_angles};
use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, instrument};

/// Everything about an input graph that does not depend on the learned
/// parameters: indices, triplets, geometry and basis values.
///
/// Computed once per graph and shared read-only by every interaction layer.
#[derive(Debug, Clone)]
pub struct PreparedGraph {
    pub z: Vec<usize>,
    pub idx_i: Vec<usize>,
    pub idx_j: Vec<usize>,
    pub triplets: Triplets,
    pub geometry: EdgeGeometry,
    pub angles: Vec<f64>,
    pub radial: DMatrix<f64>,
    pub angular: DMatrix<f64>,
    pub cutoff_weights: Option<DVector<f64>>,
    pub valence_mask: Option<DMatrix<f64>>,
    pub batch: Batch,
    pub atom_counts: Vec<usize>,
}

impl PreparedGraph {
    pub fn n_atoms(&self) -> usize {
        self.z.len()
    }

    pub fn n_edges(&self) -> usize {
        self.idx_i.len()
    }

    pub fn n_structures(&self) -> usize {
        self.batch.n_structures()
    }
}

/// The LCAONet property predictor.
#[derive(Debug)]
pub struct LcaoNet {
    config: ModelConfig,
    elec_info: ElecInfo,
    embed_z: EmbedZ,
    embed_elec: EmbedElec,
    embed_node: EmbedNode,
    embed_coeffs: EmbedCoeffs,
    valence: Option<ValenceMask>,
    radial: Box<dyn RadialBasis>,
    angular: Box<dyn AngularBasis>,
    cutoff: Option<Box<dyn CutoffFunction>>,
    interactions: Vec<LcaoInteraction>,
    output: LcaoOut,
    post_process: PostProcess,
}

impl LcaoNet {
    /// Builds a model with parameters drawn deterministically from
    /// `config.seed`.
    #[instrument(skip_all, name = "lcaonet_init")]
    pub fn new(config: ModelConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let elec_info = ElecInfo::new(config.max_z, config.max_orb)?;
        let orbitals = elec_info.orbitals();

        let radial = config.rbf_type.build(orbitals, config.cutoff)?;
        let angular: Box<dyn AngularBasis> = Box::new(SphericalHarmonicsBasis::new(orbitals));
        let cutoff = config
            .cutoff_net
            .map(|kind| kind.build(config.cutoff))
            .transpose()?;

        let hidden = config.hidden_dim;
        let coeffs = config.coeffs_dim;
        let elec_dim = if config.elec_to_node { hidden + coeffs } else { coeffs };
        let (act, init) = (config.activation, config.weight_init);

        let mut rng = StdRng::seed_from_u64(config.seed);
        let embed_z = EmbedZ::new(config.max_z, hidden + coeffs, &mut rng);
        let embed_elec = EmbedElec::new(elec_dim, &elec_info, config.extend_orb, &mut rng);
        let embed_node = EmbedNode::new(
            hidden,
            hidden,
            config.elec_to_node.then_some(hidden),
            act,
            init,
            &mut rng,
        );
        let embed_coeffs = EmbedCoeffs::new(coeffs, coeffs, coeffs, act, init, &mut rng);
        let interactions = (0..config.n_interaction)
            .map(|_| {
                LcaoInteraction::new(
                    hidden,
                    coeffs,
                    config.conv_dim,
                    config.add_valence,
                    act,
                    init,
                    &mut rng,
                )
            })
            .collect();
        let output = LcaoOut::new(hidden, config.out_dim, config.is_extensive, act, init, &mut rng);
        let post_process = PostProcess::new(
            config.atomref.clone(),
            config.mean.clone(),
            Reduction::from_extensive(config.is_extensive),
        );
        let valence = config.add_valence.then(|| ValenceMask::new(&elec_info));

        let model = Self {
            config,
            elec_info,
            embed_z,
            embed_elec,
            embed_node,
            embed_coeffs,
            valence,
            radial,
            angular,
            cutoff,
            interactions,
            output,
            post_process,
        };
        info!(
            "Initialised LCAONet with {} orbitals, {} interaction layers and {} parameters.",
            model.elec_info.n_orb(),
            model.interactions.len(),
            model.parameter_count()
        );
        Ok(model)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn elec_info(&self) -> &ElecInfo {
        &self.elec_info
    }

    pub fn interactions(&self) -> &[LcaoInteraction] {
        &self.interactions
    }

    pub fn interactions_mut(&mut self) -> &mut [LcaoInteraction] {
        &mut self.interactions
    }

    pub fn parameter_count(&self) -> usize {
        self.embed_z.table.parameter_count()
            + self.embed_elec.parameter_count()
            + self.embed_node.f_enc.parameter_count()
            + self.embed_coeffs.parameter_count()
            + self
                .interactions
                .iter()
                .map(LcaoInteraction::parameter_count)
                .sum::<usize>()
            + self.output.parameter_count()
    }

    /// Computes the parameter-independent data of `graph`.
    #[instrument(skip_all, name = "prepare_graph")]
    pub fn prepare(&self, graph: &AtomGraph) -> Result<PreparedGraph, EngineError> {
        graph.check_atomic_numbers(self.config.max_z)?;

        let z: Vec<usize> = graph.atomic_numbers().iter().map(|&z| z as usize).collect();
        let idx_i: Vec<usize> = graph.edges().iter().map(|e| e.target).collect();
        let idx_j: Vec<usize> = graph.edges().iter().map(|e| e.source).collect();
        let triplets = Triplets::from_graph(graph);
        let geometry = edge_geometry(graph);
        let angles = triplet_angles(&geometry.vectors, &triplets.edge_kj, &triplets.edge_ji);

        let radial = self.radial.compute(&geometry.distances);
        let angular = self.angular.compute(&angles);
        let cutoff_weights = self
            .cutoff
            .as_ref()
            .map(|c| c.compute(&geometry.distances));
        let valence_mask = self.valence.as_ref().map(|v| v.forward(&z, &idx_j));

        debug!(
            "Prepared graph: {} atoms, {} edges, {} triplets, {} structures.",
            z.len(),
            idx_i.len(),
            triplets.len(),
            graph.n_structures()
        );

        Ok(PreparedGraph {
            z,
            idx_i,
            idx_j,
            triplets,
            geometry,
            angles,
            radial,
            angular,
            cutoff_weights,
            valence_mask,
            batch: graph.batch().clone(),
            atom_counts: graph.atom_counts(),
        })
    }

    /// Initial `N × hidden_dim` node embeddings, before any interaction.
    pub fn initial_node_embeddings(
        &self,
        prepared: &PreparedGraph,
    ) -> Result<DMatrix<f64>, EngineError> {
        Ok(self.encode(prepared)?.0)
    }

    /// Node embeddings and the `E × n_orb × coeffs_dim` coefficient embedding.
    pub fn encode(
        &self,
        prepared: &PreparedGraph,
    ) -> Result<(DMatrix<f64>, OrbitalTensor), EngineError> {
        let hidden = self.config.hidden_dim;
        let z_embed = self.embed_z.forward(&prepared.z);
        let z_node = z_embed.columns(0, hidden).into_owned();
        let z_coeff = z_embed
            .columns(hidden, self.config.coeffs_dim)
            .into_owned();

        let e_embed = self.embed_elec.forward(&prepared.z);
        let (e_node, e_coeff) = if self.config.elec_to_node {
            let (node, coeff) = e_embed.split_columns(hidden);
            (Some(node), coeff)
        } else {
            (None, e_embed)
        };

        let x = self.embed_node.forward(&z_node, e_node.as_ref())?;
        let coeffs = self
            .embed_coeffs
            .forward(&z_coeff, &e_coeff, &prepared.idx_i, &prepared.idx_j);
        Ok((x, coeffs))
    }

    /// Final node embeddings after every interaction layer.
    #[instrument(skip_all, name = "lcaonet_message_passing")]
    pub fn node_embeddings(&self, prepared: &PreparedGraph) -> Result<DMatrix<f64>, EngineError> {
        let (mut x, coeffs) = self.encode(prepared)?;
        let inputs = InteractionInputs {
            coeffs: &coeffs,
            valence_mask: prepared.valence_mask.as_ref(),
            cutoff_weights: prepared.cutoff_weights.as_ref(),
            radial: &prepared.radial,
            angular: &prepared.angular,
            idx_i: &prepared.idx_i,
            idx_j: &prepared.idx_j,
            triplets: &prepared.triplets,
        };
        for layer in &self.interactions {
            x = layer.forward(&x, &inputs)?;
        }
        Ok(x)
    }

    /// `B × out_dim` predictions from final node embeddings, including the
    /// reference and mean offsets.
    pub fn readout(
        &self,
        x: &DMatrix<f64>,
        prepared: &PreparedGraph,
    ) -> Result<DMatrix<f64>, EngineError> {
        EngineError::check_len("node embedding rows", prepared.n_atoms(), x.nrows())?;
        let mut out = self.output.forward(x, &prepared.batch);
        self.post_process
            .apply(&mut out, &prepared.z, &prepared.batch, &prepared.atom_counts)?;
        Ok(out)
    }

    pub fn forward_prepared(&self, prepared: &PreparedGraph) -> Result<DMatrix<f64>, EngineError> {
        let x = self.node_embeddings(prepared)?;
        self.readout(&x, prepared)
    }

    /// Predicts `B × out_dim` properties, one row per structure of `graph`.
    #[instrument(skip_all, name = "lcaonet_forward")]
    pub fn forward(&self, graph: &AtomGraph) -> Result<DMatrix<f64>, EngineError> {
        let prepared = self.prepare(graph)?;
        self.forward_prepared(&prepared)
    }
}
