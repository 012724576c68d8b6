pub mod crm_action_routes;
